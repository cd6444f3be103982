//! Wiring of call slots to callee instances.
//!
//! Every call slot of every component is bound to one instance of its
//! callee. Each callee instance with at least one bound slot gets a proxy
//! process that serves the slots one invocation at a time: it forwards the
//! parameters and `_Started` of a waiting slot, and once the instance
//! finished it hands the return value and `_Finished` back to that slot.
//! The instance is released as soon as it returned to its start state, so
//! a caller still waiting for sibling invocations never blocks it.

use crate::architecture_component::ArchitectureComponent;
use crate::call_graph::InstanceCounts;
use crate::error::TransformError;
use crate::member_transformer::TransformedMember;
use crate::naming;
use crate::tree::SyntaxTree;
use hast_common::InternalError;
use hast_vhdl::{
    BinaryOperator, Case, CaseWhen, DataObject, DataObjectReference, DataType, Declaration,
    ElseIf, Enum, Expression, IfElse, Invokation, Process, Statement, UnaryOperator, Value,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// One call slot and the callee instance serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSlot {
    /// Component name of the caller.
    pub caller: String,
    /// Full name of the callee member.
    pub callee: String,
    /// Slot index within the caller.
    pub index: u32,
    /// Serving instance; `None` when recursion exceeds the instances built.
    pub instance: Option<u32>,
}

impl CallSlot {
    /// Name prefix of the slot's signals.
    pub fn name(&self) -> String {
        naming::call_slot(&self.caller, &self.callee, self.index)
    }
}

/// Binds every call slot of `members` to a callee instance.
///
/// Slot `j` of instance `i` of a member calling itself runs on instance
/// `i + 1 + j`, so every recursion level has its own instance. Other slots
/// go to the least loaded instance of the callee's internal pool that the
/// same caller does not use yet, lowest index first. `members` should be
/// sorted for the allocation to be reproducible.
pub fn allocate_call_slots(members: &[TransformedMember], counts: &InstanceCounts) -> Vec<CallSlot> {
    let mut load: BTreeMap<(&str, u32), usize> = BTreeMap::new();
    let mut slots = Vec::new();
    for member in members {
        for (callee, &slot_count) in &member.component.other_member_max_call_instance_counts {
            let pool = counts.internal_instances(callee);
            let mut taken = BTreeSet::new();
            for index in 0..slot_count {
                let instance = if *callee == member.member_name {
                    let target = member.instance + 1 + index;
                    pool.contains(&target).then_some(target)
                } else {
                    pool.clone()
                        .filter(|candidate| !taken.contains(candidate))
                        .min_by_key(|candidate| load.get(&(callee.as_str(), *candidate)).copied().unwrap_or(0))
                };
                if let Some(instance) = instance {
                    taken.insert(instance);
                    *load.entry((callee.as_str(), instance)).or_insert(0) += 1;
                }
                slots.push(CallSlot {
                    caller: member.component.name.clone(),
                    callee: callee.clone(),
                    index,
                    instance,
                });
            }
        }
    }
    slots
}

/// The proxies of a design and the problems found while wiring them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternalInvocationProxies {
    /// One process per callee instance with bound slots.
    pub processes: Vec<Process>,
    /// Slots left unconnected.
    pub warnings: Vec<String>,
}

/// Builds the proxies serving every call slot of `members`.
pub fn build_internal_invocation_proxies(
    tree: &SyntaxTree,
    members: &[TransformedMember],
    counts: &InstanceCounts,
) -> Result<InternalInvocationProxies, TransformError> {
    let components: BTreeMap<&str, &ArchitectureComponent> = members
        .iter()
        .map(|member| (member.component.name.as_str(), &member.component))
        .collect();

    let mut proxies = InternalInvocationProxies::default();
    let mut served: BTreeMap<(String, u32), Vec<CallSlot>> = BTreeMap::new();
    for slot in allocate_call_slots(members, counts) {
        match slot.instance {
            Some(instance) => served.entry((slot.callee.clone(), instance)).or_default().push(slot),
            None => {
                let message = format!(
                    "call slot '{}' has no instance of '{}' left to run on; raise its max_recursion_depth",
                    slot.name(),
                    slot.callee
                );
                warn!(slot = %slot.name(), callee = %slot.callee, "unconnected call slot");
                proxies.warnings.push(message);
            }
        }
    }

    for ((callee, instance), slots) in served {
        let parameters: Vec<String> = tree
            .member(&callee)
            .ok_or_else(|| TransformError::UnknownMember(callee.clone()))?
            .parameters
            .iter()
            .map(|parameter| parameter.name.clone())
            .collect();
        let has_return = tree.member(&callee).is_some_and(|member| member.return_type.is_some());
        let component_name = naming::component_name(&callee, instance);
        let callee_component = components
            .get(component_name.as_str())
            .copied()
            .ok_or_else(|| InternalError::new(format!("instance '{component_name}' was never transformed")))?;
        let mut callers = Vec::with_capacity(slots.len());
        for slot in &slots {
            let caller = components
                .get(slot.caller.as_str())
                .copied()
                .ok_or_else(|| InternalError::new(format!("caller '{}' was never transformed", slot.caller)))?;
            callers.push((slot.name(), caller));
        }
        let proxy = ProxyBuilder {
            name: naming::internal_proxy_process(&callee, instance),
            callee: callee_component,
            parameters: &parameters,
            has_return,
            slots: callers,
        };
        proxies.processes.push(proxy.build());
    }
    Ok(proxies)
}

struct ProxyBuilder<'a> {
    name: String,
    callee: &'a ArchitectureComponent,
    parameters: &'a [String],
    has_return: bool,
    slots: Vec<(String, &'a ArchitectureComponent)>,
}

fn signal(name: impl Into<String>) -> DataObjectReference {
    DataObjectReference::signal(name)
}

fn not(expression: impl Into<Expression>) -> Expression {
    Expression::unary(UnaryOperator::Not, expression.into())
}

fn set(target: DataObjectReference, value: bool) -> Statement {
    Statement::assign(target, Value::Boolean(value))
}

/// Restores `name`, declared by `owner`, to its initial value.
fn reset(owner: &ArchitectureComponent, name: &str) -> Option<Statement> {
    let object = owner.signal(name)?;
    let value = object.initial_value.clone()?;
    Some(Statement::assign(object.to_reference(), value))
}

impl ProxyBuilder<'_> {
    fn state(&self, state: &str) -> String {
        format!("{}.{state}", self.name)
    }

    fn goto(&self, state: &str) -> Statement {
        Statement::assign(
            DataObjectReference::variable(naming::state_variable(&self.name)),
            Expression::EnumValue(self.state(state)),
        )
    }

    fn running_index(&self) -> DataObjectReference {
        DataObjectReference::variable(format!("{}.RunningIndex", self.name))
    }

    fn build(&self) -> Process {
        let callee = self.callee.name.as_str();
        let states = Enum {
            name: naming::state_type(&self.name),
            values: ["WaitingForStarted", "WaitingForFinished", "AfterFinished"]
                .iter()
                .map(|state| self.state(state))
                .collect(),
        };

        let mut process = Process::new(self.name.clone());
        process.declarations.push(Declaration::Type(DataType::Enum(states.clone())));
        process.declarations.push(
            DataObject::variable(naming::state_variable(&self.name), DataType::Enum(states))
                .with_initial_value(Expression::EnumValue(self.state("WaitingForStarted")))
                .into(),
        );
        process.declarations.push(
            DataObject::variable(format!("{}.RunningIndex", self.name), DataType::Integer)
                .with_initial_value(Value::Integer(0).into())
                .into(),
        );

        let mut reset_body = vec![
            Statement::LineComment("Synchronous reset".to_string()),
            self.goto("WaitingForStarted"),
            Statement::assign(self.running_index(), Value::Integer(0)),
            set(signal(naming::started(callee)), false),
        ];
        reset_body.extend(
            self.parameters
                .iter()
                .filter_map(|parameter| reset(self.callee, &naming::parameter_in(callee, parameter))),
        );
        for (slot, caller) in &self.slots {
            reset_body.push(set(signal(naming::finished(slot)), false));
            reset_body.extend(reset(caller, &naming::return_value(slot)));
        }

        let mut running = Vec::new();
        for (slot, _) in &self.slots {
            running.push(
                IfElse::new(
                    not(signal(naming::started(slot))),
                    vec![set(signal(naming::finished(slot)), false)],
                )
                .into(),
            );
        }
        running.push(
            Case {
                expression: DataObjectReference::variable(naming::state_variable(&self.name)).into(),
                whens: vec![
                    CaseWhen {
                        choice: Some(Expression::EnumValue(self.state("WaitingForStarted"))),
                        body: self.waiting_for_started(),
                    },
                    CaseWhen {
                        choice: Some(Expression::EnumValue(self.state("WaitingForFinished"))),
                        body: self.waiting_for_finished(),
                    },
                    CaseWhen {
                        choice: Some(Expression::EnumValue(self.state("AfterFinished"))),
                        body: vec![IfElse::new(
                            not(signal(naming::finished(callee))),
                            vec![self.goto("WaitingForStarted")],
                        )
                        .into()],
                    },
                ],
            }
            .into(),
        );

        let body = IfElse::new(
            Expression::equals(signal(naming::RESET).into(), Value::StdLogic('1').into()),
            reset_body,
        )
        .with_else(running);
        process.body.push(
            IfElse::new(
                Invokation::rising_edge(signal(naming::CLOCK).into()),
                vec![body.into()],
            )
            .into(),
        );
        process
    }

    /// Starts the callee for the first slot, in slot order, that requested
    /// an invocation it was not served yet.
    fn waiting_for_started(&self) -> Vec<Statement> {
        let callee = self.callee.name.as_str();
        let mut branches = self.slots.iter().enumerate().map(|(index, (slot, _))| {
            let condition = Expression::binary(
                BinaryOperator::And,
                signal(naming::started(slot)).into(),
                not(signal(naming::finished(slot))),
            );
            let mut body = vec![Statement::assign(self.running_index(), Value::Integer(index as i64))];
            body.extend(self.parameters.iter().map(|parameter| {
                Statement::assign(
                    signal(naming::parameter_in(callee, parameter)),
                    signal(naming::parameter_out(slot, parameter)),
                )
            }));
            body.push(set(signal(naming::started(callee)), true));
            body.push(self.goto("WaitingForFinished"));
            ElseIf { condition, body }
        });

        let Some(first) = branches.next() else {
            return vec![Statement::Null];
        };
        vec![IfElse {
            condition: first.condition,
            true_body: first.body,
            else_ifs: branches.collect(),
            else_body: Vec::new(),
        }
        .into()]
    }

    /// Hands the result to the slot being served once the callee finished.
    fn waiting_for_finished(&self) -> Vec<Statement> {
        let callee = self.callee.name.as_str();
        let mut whens: Vec<CaseWhen> = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, (slot, _))| {
                let mut body = vec![set(signal(naming::finished(slot)), true)];
                if self.has_return {
                    body.push(Statement::assign(
                        signal(naming::return_value(slot)),
                        signal(naming::return_value(callee)),
                    ));
                }
                CaseWhen {
                    choice: Some(Value::Integer(index as i64).into()),
                    body,
                }
            })
            .collect();
        whens.push(CaseWhen {
            choice: None,
            body: vec![Statement::Null],
        });

        vec![IfElse::new(
            signal(naming::finished(callee)).into(),
            vec![
                set(signal(naming::started(callee)), false),
                Case {
                    expression: self.running_index().into(),
                    whens,
                }
                .into(),
                self.goto("AfterFinished"),
            ],
        )
        .into()]
    }
}
