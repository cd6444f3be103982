//! Sequential and concurrent statements, processes and blocks.

use crate::declaration::Declaration;
use crate::expression::{DataObjectKind, DataObjectReference, Expression, Invokation};
use crate::options::VhdlGenerationOptions;
use crate::render::{comment_lines, identifier, indent, statement_line, terminate, Render};
use serde::{Deserialize, Serialize};

/// An assignment; `<=` when the target is a signal, `:=` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// The assigned object or element.
    pub target: Expression,
    /// The assigned value.
    pub expression: Expression,
}

impl Assignment {
    /// Creates an assignment.
    pub fn new(target: impl Into<Expression>, expression: impl Into<Expression>) -> Self {
        Self {
            target: target.into(),
            expression: expression.into(),
        }
    }
}

impl Render for Assignment {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let operator = match self.target.data_object_kind() {
            Some(DataObjectKind::Signal) => "<=",
            _ => ":=",
        };
        statement_line(
            &format!(
                "{} {operator} {}",
                self.target.to_vhdl(options),
                self.expression.to_vhdl(options)
            ),
            options,
        )
    }
}

/// One `value when condition` arm of a conditional signal assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalAssignmentWhen {
    /// Value assigned when the condition holds.
    pub value: Expression,
    /// The condition.
    pub condition: Expression,
}

/// `target <= a when c1 else b when c2 else d;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalSignalAssignment {
    /// The driven signal.
    pub target: DataObjectReference,
    /// Arms in priority order.
    pub whens: Vec<SignalAssignmentWhen>,
    /// Value when no arm matches.
    pub else_value: Expression,
}

impl Render for ConditionalSignalAssignment {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let arms: String = self
            .whens
            .iter()
            .map(|arm| {
                format!(
                    "{} when {} else ",
                    arm.value.to_vhdl(options),
                    arm.condition.to_vhdl(options)
                )
            })
            .collect();
        statement_line(
            &format!(
                "{} <= {arms}{}",
                self.target.to_vhdl(options),
                self.else_value.to_vhdl(options)
            ),
            options,
        )
    }
}

/// An `elsif` branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElseIf {
    /// Branch condition.
    pub condition: Expression,
    /// Branch body.
    pub body: Vec<Statement>,
}

/// `if ... elsif ... else ... end if;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfElse {
    /// Condition of the first branch.
    pub condition: Expression,
    /// Body of the first branch.
    pub true_body: Vec<Statement>,
    /// `elsif` branches in order.
    pub else_ifs: Vec<ElseIf>,
    /// The `else` body; no `else` is rendered when empty.
    pub else_body: Vec<Statement>,
}

impl IfElse {
    /// An `if` without further branches.
    pub fn new(condition: Expression, true_body: Vec<Statement>) -> Self {
        Self {
            condition,
            true_body,
            else_ifs: Vec::new(),
            else_body: Vec::new(),
        }
    }

    /// Adds an `else` body.
    pub fn with_else(mut self, else_body: Vec<Statement>) -> Self {
        self.else_body = else_body;
        self
    }
}

impl Render for IfElse {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let newline = options.newline();
        let mut code = format!(
            "if ({}) then{newline}{}",
            self.condition.to_vhdl(options),
            indent(&self.true_body.to_vhdl(options), options)
        );
        for branch in &self.else_ifs {
            code.push_str(&format!(
                "elsif ({}) then{newline}{}",
                branch.condition.to_vhdl(options),
                indent(&branch.body.to_vhdl(options), options)
            ));
        }
        if !self.else_body.is_empty() {
            code.push_str(&format!(
                "else{newline}{}",
                indent(&self.else_body.to_vhdl(options), options)
            ));
        }
        code.push_str(&format!("end if;{newline}"));
        code
    }
}

/// One `when` arm of a case statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseWhen {
    /// The choice; `None` renders `others`.
    pub choice: Option<Expression>,
    /// Arm body.
    pub body: Vec<Statement>,
}

/// `case ... is when ... end case;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// The selector.
    pub expression: Expression,
    /// Arms in order.
    pub whens: Vec<CaseWhen>,
}

impl Render for Case {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let newline = options.newline();
        let arms: String = self
            .whens
            .iter()
            .map(|arm| {
                let choice = arm
                    .choice
                    .as_ref()
                    .map(|choice| choice.to_vhdl(options))
                    .unwrap_or_else(|| "others".to_owned());
                format!(
                    "when {choice} =>{newline}{}",
                    indent(&arm.body.to_vhdl(options), options)
                )
            })
            .collect();
        format!(
            "case {} is{newline}{}end case;{newline}",
            self.expression.to_vhdl(options),
            indent(&arms, options)
        )
    }
}

/// A process. Used both for combinational proxies and clocked state machines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Optional label.
    pub label: Option<String>,
    /// Signals the process is sensitive to.
    pub sensitivity_list: Vec<DataObjectReference>,
    /// Declarative part.
    pub declarations: Vec<Declaration>,
    /// Statements.
    pub body: Vec<Statement>,
}

impl Process {
    /// An empty process with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Adds a signal to the sensitivity list unless it is already there.
    pub fn add_to_sensitivity_list(&mut self, signal: DataObjectReference) {
        if !self.sensitivity_list.contains(&signal) {
            self.sensitivity_list.push(signal);
        }
    }
}

impl Render for Process {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let newline = options.newline();
        let label = self
            .label
            .as_ref()
            .map(|label| format!("{}: ", identifier(label, options)))
            .unwrap_or_default();
        let sensitivity = if self.sensitivity_list.is_empty() {
            String::new()
        } else {
            let names: Vec<String> = self
                .sensitivity_list
                .iter()
                .map(|signal| signal.to_vhdl(options))
                .collect();
            format!(" ({})", names.join(", "))
        };
        format!(
            "{label}process{sensitivity} is{newline}{}begin{newline}{}end process;{newline}",
            indent(&self.declarations.to_vhdl(options), options),
            indent(&self.body.to_vhdl(options), options)
        )
    }
}

/// `port => expression` inside a port map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Formal port name.
    pub port: String,
    /// Actual.
    pub expression: Expression,
}

/// `label: component port map (...);`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstance {
    /// Instance label.
    pub label: String,
    /// Instantiated component.
    pub component_name: String,
    /// Port associations.
    pub port_mappings: Vec<PortMapping>,
}

impl Render for ComponentInstance {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        let newline = options.newline();
        let mappings: Vec<String> = self
            .port_mappings
            .iter()
            .map(|mapping| {
                format!(
                    "{} => {}",
                    identifier(&mapping.port, options),
                    mapping.expression.to_vhdl(options)
                )
            })
            .collect();
        let separator = format!(",{newline}");
        format!(
            "{}: {}{newline}port map ({newline}{}{newline});{newline}",
            identifier(&self.label, options),
            identifier(&self.component_name, options),
            indent(&mappings.join(&separator), options).trim_end()
        )
    }
}

/// A statement of a process or architecture body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Signal or variable assignment.
    Assignment(Assignment),
    /// Concurrent conditional signal assignment.
    ConditionalSignalAssignment(ConditionalSignalAssignment),
    /// If/elsif/else.
    IfElse(IfElse),
    /// Case.
    Case(Case),
    /// A process.
    Process(Process),
    /// A component instantiation.
    ComponentInstance(ComponentInstance),
    /// A procedure call.
    Invokation(Invokation),
    /// `return` with an optional value.
    Return(Option<Expression>),
    /// `null;`
    Null,
    /// A single `--` comment line.
    LineComment(String),
    /// A multi-line comment.
    BlockComment(String),
    /// Statements that belong together, separated from what follows by an
    /// empty line when formatting.
    LogicalBlock(Vec<Statement>),
    /// Statements rendered back to back.
    InlineBlock(Vec<Statement>),
    /// Unescaped text followed by exactly one `;`.
    Terminated(String),
    /// Unescaped text.
    Raw(String),
}

impl Statement {
    /// Shorthand for an assignment statement.
    pub fn assign(target: impl Into<Expression>, expression: impl Into<Expression>) -> Self {
        Statement::Assignment(Assignment::new(target, expression))
    }
}

impl Render for Statement {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        match self {
            Statement::Assignment(assignment) => assignment.to_vhdl(options),
            Statement::ConditionalSignalAssignment(assignment) => assignment.to_vhdl(options),
            Statement::IfElse(if_else) => if_else.to_vhdl(options),
            Statement::Case(case) => case.to_vhdl(options),
            Statement::Process(process) => process.to_vhdl(options),
            Statement::ComponentInstance(instance) => instance.to_vhdl(options),
            Statement::Invokation(invokation) => {
                statement_line(&invokation.to_vhdl(options), options)
            }
            Statement::Return(value) => {
                let code = match value {
                    Some(value) => format!("return {}", value.to_vhdl(options)),
                    None => "return".to_owned(),
                };
                statement_line(&code, options)
            }
            Statement::Null => statement_line("null", options),
            Statement::LineComment(text) => {
                comment_lines(text.lines().next().unwrap_or_default(), options)
            }
            Statement::BlockComment(text) => comment_lines(text, options),
            Statement::LogicalBlock(statements) => {
                let body = statements.to_vhdl(options);
                if options.format_code && !body.is_empty() {
                    format!("{body}\n")
                } else {
                    body
                }
            }
            Statement::InlineBlock(statements) => statements.to_vhdl(options),
            Statement::Terminated(code) => {
                format!("{}{}", terminate(code), options.newline())
            }
            Statement::Raw(code) => code.clone(),
        }
    }
}

impl From<Assignment> for Statement {
    fn from(assignment: Assignment) -> Self {
        Statement::Assignment(assignment)
    }
}

impl From<IfElse> for Statement {
    fn from(if_else: IfElse) -> Self {
        Statement::IfElse(if_else)
    }
}

impl From<Case> for Statement {
    fn from(case: Case) -> Self {
        Statement::Case(case)
    }
}

impl From<Process> for Statement {
    fn from(process: Process) -> Self {
        Statement::Process(process)
    }
}
