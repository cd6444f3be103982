//! Finite-state machines built from members.
//!
//! Every machine starts with two fixed states. State 0 idles until the
//! `_Started` signal rises and then jumps to state 2, the first body state.
//! State 1 is entered when the body is done: it holds `_Finished` high for as
//! long as `_Started` stays high and returns to state 0 once it drops. A
//! caller therefore raises `_Started`, waits for `_Finished`, then lowers
//! `_Started` before the callee can be started again.

use crate::architecture_component::{ArchitectureComponent, ArchitectureComponentResult};
use crate::naming;
use hast_common::{HastResult, InternalError};
use hast_vhdl::{
    Case, CaseWhen, DataObject, DataObjectReference, DataType, Declaration, Enum, Expression,
    IfElse, Invokation, Process, Statement, Value,
};

/// Index of the idle state.
pub const START_STATE_INDEX: usize = 0;
/// Index of the state signalling completion.
pub const FINAL_STATE_INDEX: usize = 1;
/// Index of the first state holding member logic.
pub const FIRST_BODY_STATE_INDEX: usize = 2;

/// One state of a [`MemberStateMachine`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemberState {
    /// Statements executed in one clock cycle while in this state.
    pub body: Vec<Statement>,
    /// Estimated clock cycles the state's logic needs; informational.
    pub required_clock_cycles: f64,
}

/// A state machine under construction, with the component it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberStateMachine {
    component: ArchitectureComponent,
    states: Vec<MemberState>,
}

impl MemberStateMachine {
    /// A machine holding only the start and final states.
    pub fn new(name: impl Into<String>) -> Self {
        let component = ArchitectureComponent::new(name);
        let started: Expression = component.started_reference().into();
        let finished = component.finished_reference();

        let start_state = MemberState {
            body: vec![
                Statement::BlockComment("Start state\nWaiting for the start signal.".to_string()),
                IfElse::new(
                    started.clone(),
                    vec![change_state(&component.name, FIRST_BODY_STATE_INDEX)],
                )
                .into(),
            ],
            required_clock_cycles: 0.0,
        };
        let final_state = MemberState {
            body: vec![
                Statement::BlockComment(
                    "Final state\nSignaling finished until Started is pulled back to false, then returning to the start state."
                        .to_string(),
                ),
                IfElse::new(
                    started,
                    vec![Statement::assign(finished.clone(), Value::Boolean(true))],
                )
                .with_else(vec![
                    Statement::assign(finished, Value::Boolean(false)),
                    change_state(&component.name, START_STATE_INDEX),
                ])
                .into(),
            ],
            required_clock_cycles: 0.0,
        };

        Self {
            component,
            states: vec![start_state, final_state],
        }
    }

    /// The machine's name.
    pub fn name(&self) -> &str {
        &self.component.name
    }

    /// The component bookkeeping.
    pub fn component(&self) -> &ArchitectureComponent {
        &self.component
    }

    /// Mutable access to the component bookkeeping.
    pub fn component_mut(&mut self) -> &mut ArchitectureComponent {
        &mut self.component
    }

    /// Appends a state and returns its index.
    pub fn add_state(&mut self, body: Vec<Statement>) -> usize {
        self.states.push(MemberState {
            body,
            required_clock_cycles: 0.0,
        });
        self.states.len() - 1
    }

    /// Number of states, the two fixed ones included.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// A state by index.
    pub fn state(&self, index: usize) -> HastResult<&MemberState> {
        self.states
            .get(index)
            .ok_or_else(|| InternalError::new(format!("state {index} of '{}' was never allocated", self.name())))
    }

    /// Mutable access to a state by index.
    pub fn state_mut(&mut self, index: usize) -> HastResult<&mut MemberState> {
        let name = self.component.name.clone();
        self.states
            .get_mut(index)
            .ok_or_else(|| InternalError::new(format!("state {index} of '{name}' was never allocated")))
    }

    /// A statement switching to state `index` on the next clock edge.
    pub fn change_state_to(&self, index: usize) -> Statement {
        change_state(self.name(), index)
    }

    fn state_enum(&self) -> Enum {
        Enum {
            name: naming::state_type(self.name()),
            values: (0..self.states.len())
                .map(|index| naming::state(self.name(), index))
                .collect(),
        }
    }

    /// The state enum type followed by the component's declarations.
    pub fn build_declarations(&self) -> Vec<Declaration> {
        let mut declarations = vec![Declaration::Type(DataType::Enum(self.state_enum()))];
        declarations.extend(self.component.build_declarations());
        declarations
    }

    /// The clocked process running the machine.
    ///
    /// Fails if no body state was added, since the start state jumps to
    /// state 2 unconditionally.
    pub fn build_body(&self) -> HastResult<Process> {
        if self.states.len() <= FIRST_BODY_STATE_INDEX {
            return Err(InternalError::new(format!(
                "state machine '{}' has no body state",
                self.name()
            )));
        }

        let state_enum = self.state_enum();
        let state_variable = DataObject::variable(
            naming::state_variable(self.name()),
            DataType::Enum(state_enum.clone()),
        )
        .with_initial_value(Expression::EnumValue(naming::state(self.name(), START_STATE_INDEX)));

        let mut process = Process::new(naming::state_machine_process(self.name()));
        process.declarations.push(state_variable.into());
        process
            .declarations
            .extend(self.component.local_variables.iter().cloned().map(Declaration::DataObject));

        let mut reset_body = vec![
            Statement::LineComment("Synchronous reset".to_string()),
            self.change_state_to(START_STATE_INDEX),
        ];
        reset_body.extend(self.component.reset_statements());

        let whens = self
            .states
            .iter()
            .zip(state_enum.values)
            .map(|(state, literal)| {
                let mut body = vec![Statement::LineComment(format!(
                    "Clock cycles needed to complete this state (approximation): {}",
                    rounded_cycles(state.required_clock_cycles)
                ))];
                body.extend(state.body.iter().cloned());
                CaseWhen {
                    choice: Some(Expression::EnumValue(literal)),
                    body,
                }
            })
            .collect();
        let case = Case {
            expression: DataObjectReference::variable(naming::state_variable(self.name())).into(),
            whens,
        };

        let reset = IfElse::new(
            Expression::equals(
                DataObjectReference::signal(naming::RESET).into(),
                Value::StdLogic('1').into(),
            ),
            reset_body,
        )
        .with_else(vec![case.into()]);
        let clocked = IfElse::new(
            Invokation::rising_edge(DataObjectReference::signal(naming::CLOCK).into()),
            vec![reset.into()],
        );
        process.body.push(clocked.into());
        Ok(process)
    }

    /// Renders declarations and body.
    pub fn build(&self) -> HastResult<ArchitectureComponentResult> {
        Ok(ArchitectureComponentResult {
            declarations: self.build_declarations(),
            body: self.build_body()?,
        })
    }
}

fn change_state(component: &str, index: usize) -> Statement {
    Statement::assign(
        DataObjectReference::variable(naming::state_variable(component)),
        Expression::EnumValue(naming::state(component, index)),
    )
}

fn rounded_cycles(cycles: f64) -> f64 {
    (cycles * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use hast_vhdl::{Render, VhdlGenerationOptions};

    fn options() -> VhdlGenerationOptions {
        VhdlGenerationOptions::debug()
    }

    fn machine() -> MemberStateMachine {
        let mut machine = MemberStateMachine::new("M.0");
        let index = machine.add_state(vec![machine.change_state_to(FINAL_STATE_INDEX)]);
        assert_eq!(index, FIRST_BODY_STATE_INDEX);
        machine
    }

    #[test]
    fn fresh_machine_has_two_states() {
        let machine = MemberStateMachine::new("M.0");
        assert_eq!(machine.state_count(), 2);
        assert!(machine.build_body().is_err());
        assert!(machine.state(2).is_err());
    }

    #[test]
    fn enum_lists_states_in_order() {
        let machine = machine();
        let declarations = machine.build_declarations();
        assert_eq!(
            declarations[0].to_vhdl(&options()),
            "type \\M.0._States\\ is (\\M.0._State_0\\, \\M.0._State_1\\, \\M.0._State_2\\);\n"
        );
        assert_eq!(declarations.len(), 3);
    }

    #[test]
    fn start_state_waits_for_started() {
        let machine = machine();
        let body = machine.state(START_STATE_INDEX).unwrap().body.to_vhdl(&options());
        assert!(body.contains("if (\\M.0._Started\\) then\n    \\M.0._State\\ := \\M.0._State_2\\;\n"));
    }

    #[test]
    fn final_state_holds_finished_while_started() {
        let machine = machine();
        let body = machine.state(FINAL_STATE_INDEX).unwrap().body.to_vhdl(&options());
        let expected = "if (\\M.0._Started\\) then
    \\M.0._Finished\\ <= true;
else
    \\M.0._Finished\\ <= false;
    \\M.0._State\\ := \\M.0._State_0\\;
end if;
";
        assert!(body.ends_with(expected), "{body}");
    }

    #[test]
    fn body_is_a_clocked_case_with_reset() {
        let mut machine = machine();
        machine.state_mut(FIRST_BODY_STATE_INDEX).unwrap().required_clock_cycles = 0.1 + 0.2;
        let process = machine.build_body().unwrap();
        let vhdl = process.to_vhdl(&options());
        assert!(vhdl.starts_with("\\M.0._StateMachine\\: process is\n"));
        assert!(vhdl.contains("variable \\M.0._State\\: \\M.0._States\\ := \\M.0._State_0\\;"));
        assert!(vhdl.contains("if (rising_edge(Clock)) then"));
        assert!(vhdl.contains("if ((Reset = '1')) then"));
        assert!(vhdl.contains("\\M.0._Finished\\ <= false;"));
        assert!(!vhdl.contains("\\M.0._Started\\ <= false;"));
        assert!(vhdl.contains("case \\M.0._State\\ is"));
        assert!(vhdl.contains("when \\M.0._State_2\\ =>"));
        assert!(vhdl.contains("approximation): 0.3\n"));
    }

    #[test]
    fn comments_can_be_omitted() {
        let machine = machine();
        let options = VhdlGenerationOptions {
            omit_comments: true,
            ..options()
        };
        let vhdl = machine.build_body().unwrap().to_vhdl(&options);
        assert!(!vhdl.contains("--"));
    }
}
