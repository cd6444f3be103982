//! Lowering of members into state machines.
//!
//! Statements are packed into states until the estimated cost of a state
//! would exceed one clock cycle. Control flow becomes explicit state
//! changes, and every call or SimpleMemory access gets a dedicated state
//! waiting for its handshake.

use crate::architecture_component::{ArchitectureComponent, ArchitectureComponentResult};
use crate::error::TransformError;
use crate::naming;
use crate::state_machine::{MemberStateMachine, FINAL_STATE_INDEX};
use crate::tree::{Expression, Literal, Member, Statement, SyntaxTree, TypeRef};
use crate::type_mapping::{enum_literal, TypeMapper};
use hast_common::{BitMask, InternalError};
use hast_device::{BinaryOperation, BinaryOperator, DeviceDriver, UnaryOperator};
use hast_vhdl::{
    BinaryOperator as VhdlBinaryOperator, DataObject, DataObjectReference, DataType,
    Expression as VhdlExpression, IfElse, Invokation, Statement as VhdlStatement,
    UnaryOperator as VhdlUnaryOperator, Value,
};
use tracing::debug;

/// Everything a [`MemberTransformer`] may consult.
#[derive(Debug, Clone, Copy)]
pub struct MemberTransformerContext<'a> {
    /// The whole program.
    pub tree: &'a SyntaxTree,
    /// Type resolution against `tree`.
    pub types: TypeMapper<'a>,
    /// Operation costs of the target device.
    pub device_driver: &'a dyn DeviceDriver,
    /// Whether the SimpleMemory bus exists.
    pub use_simple_memory: bool,
}

impl<'a> MemberTransformerContext<'a> {
    /// Creates a context.
    pub fn new(tree: &'a SyntaxTree, device_driver: &'a dyn DeviceDriver, use_simple_memory: bool) -> Self {
        Self {
            tree,
            types: TypeMapper::new(tree),
            device_driver,
            use_simple_memory,
        }
    }

    /// Width of the SimpleMemory data bus.
    pub fn data_bus_width_bits(&self) -> u32 {
        self.device_driver.manifest().data_bus_width_bits()
    }
}

/// One transformed instance of a member.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedMember {
    /// Full name of the member.
    pub member_name: String,
    /// Instance index.
    pub instance: u32,
    /// The component's bookkeeping, used when wiring proxies.
    pub component: ArchitectureComponent,
    /// Rendered declarations and process.
    pub result: ArchitectureComponentResult,
    /// Number of states, the two fixed ones included.
    pub state_count: usize,
}

/// Turns one instance of a member into hardware.
pub trait MemberTransformer: Send + Sync {
    /// Transforms instance `instance` of `member`.
    fn transform(
        &self,
        context: &MemberTransformerContext<'_>,
        member: &Member,
        instance: u32,
    ) -> Result<TransformedMember, TransformError>;
}

/// The built-in transformer, producing one [`MemberStateMachine`] per
/// instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateMachineMemberTransformer;

impl MemberTransformer for StateMachineMemberTransformer {
    fn transform(
        &self,
        context: &MemberTransformerContext<'_>,
        member: &Member,
        instance: u32,
    ) -> Result<TransformedMember, TransformError> {
        let mut lowering = MemberLowering::new(context, member, instance)?;
        lowering.lower_body()?;
        let machine = lowering.machine;
        let result = machine.build()?;
        debug!(
            member = %member.full_name,
            instance,
            states = machine.state_count(),
            "transformed member"
        );
        Ok(TransformedMember {
            member_name: member.full_name.clone(),
            instance,
            component: machine.component().clone(),
            result,
            state_count: machine.state_count(),
        })
    }
}

/// A lowered expression.
#[derive(Debug, Clone)]
struct Lowered {
    vhdl: VhdlExpression,
    type_ref: TypeRef,
    cycles: f64,
}

fn initialized(object: DataObject) -> DataObject {
    match object.data_type.default_value() {
        Some(value) => object.with_initial_value(value),
        None => object,
    }
}

fn boolean_signal(name: String) -> DataObject {
    DataObject::signal(name, DataType::Boolean).with_initial_value(Value::Boolean(false).into())
}

fn signal(name: String) -> VhdlExpression {
    DataObjectReference::signal(name).into()
}

fn assign(target: impl Into<VhdlExpression>, value: impl Into<VhdlExpression>) -> VhdlStatement {
    VhdlStatement::assign(target, value)
}

/// A sized integer constant. Values that fit a VHDL integer use the
/// numeric_std conversion functions; larger ones become bit strings.
pub fn int_literal(value: i64, width: u32, signed: bool) -> VhdlExpression {
    let fits_width = width >= 63
        || if signed {
            let half = 1i64 << width.saturating_sub(1);
            (-half..half).contains(&value)
        } else {
            (0..1i64 << width).contains(&value)
        };
    if fits_width && i32::try_from(value).is_ok() && (signed || value >= 0) {
        let value = VhdlExpression::Value(Value::Integer(value));
        return if signed {
            Invokation::to_signed(value, width)
        } else {
            Invokation::to_unsigned(value, width)
        };
    }
    let bits = value as u64;
    let mut mask = BitMask::from_segments(&[bits as u32, (bits >> 32) as u32], Some(64)).resize(width);
    if signed && value < 0 && width > 64 {
        // Sign-extend past the 64 bits the value carries.
        mask = mask | (!BitMask::zero(width) << 64);
    }
    let digits: String = (0..mask.size())
        .rev()
        .map(|index| if mask.get_bit(index) { '1' } else { '0' })
        .collect();
    let type_name = if signed { "signed" } else { "unsigned" };
    VhdlExpression::Raw(format!("{type_name}'(\"{digits}\")"))
}

fn vhdl_operator(operator: BinaryOperator) -> Option<VhdlBinaryOperator> {
    let mapped = match operator {
        BinaryOperator::Add => VhdlBinaryOperator::Add,
        BinaryOperator::Subtract => VhdlBinaryOperator::Subtract,
        BinaryOperator::Multiply => VhdlBinaryOperator::Multiply,
        BinaryOperator::Divide => VhdlBinaryOperator::Divide,
        BinaryOperator::Modulus => VhdlBinaryOperator::Remainder,
        BinaryOperator::And => VhdlBinaryOperator::And,
        BinaryOperator::Or => VhdlBinaryOperator::Or,
        BinaryOperator::ExclusiveOr => VhdlBinaryOperator::Xor,
        BinaryOperator::Equality => VhdlBinaryOperator::Equality,
        BinaryOperator::Inequality => VhdlBinaryOperator::Inequality,
        BinaryOperator::LessThan => VhdlBinaryOperator::LessThan,
        BinaryOperator::LessThanOrEqual => VhdlBinaryOperator::LessThanOrEqual,
        BinaryOperator::GreaterThan => VhdlBinaryOperator::GreaterThan,
        BinaryOperator::GreaterThanOrEqual => VhdlBinaryOperator::GreaterThanOrEqual,
        BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight => return None,
    };
    Some(mapped)
}

struct MemberLowering<'c, 'a> {
    context: &'c MemberTransformerContext<'a>,
    member: &'c Member,
    machine: MemberStateMachine,
    current_state: usize,
    current_cycles: f64,
    terminated: bool,
}

impl<'c, 'a> MemberLowering<'c, 'a> {
    fn new(
        context: &'c MemberTransformerContext<'a>,
        member: &'c Member,
        instance: u32,
    ) -> Result<Self, TransformError> {
        let mut machine = MemberStateMachine::new(naming::component_name(&member.full_name, instance));
        let first = machine.add_state(Vec::new());
        let mut lowering = Self {
            context,
            member,
            machine,
            current_state: first,
            current_cycles: 0.0,
            terminated: false,
        };
        lowering.declare_storage()?;
        Ok(lowering)
    }

    fn name(&self) -> String {
        self.machine.name().to_string()
    }

    fn unsupported(&self, construct: impl Into<String>) -> TransformError {
        TransformError::unsupported(&self.member.full_name, construct)
    }

    /// Declares parameters, locals and the return signal, and copies the
    /// parameter inputs into their variables in the first body state.
    fn declare_storage(&mut self) -> Result<(), TransformError> {
        let member = self.member;
        let types = self.context.types;
        let name = self.name();
        for parameter in &member.parameters {
            let data_type = types.data_type(&parameter.type_ref)?;
            let component = self.machine.component_mut();
            let variable = component.add_local_variable(initialized(DataObject::variable(
                naming::variable(&name, &parameter.name),
                data_type.clone(),
            )));
            let input = component.add_incoming_signal(initialized(DataObject::signal(
                naming::parameter_in(&name, &parameter.name),
                data_type,
            )));
            self.emit(assign(variable, input))?;
        }
        for local in &member.locals {
            let data_type = types.data_type(&local.type_ref)?;
            self.machine.component_mut().add_local_variable(initialized(DataObject::variable(
                naming::variable(&name, &local.name),
                data_type,
            )));
        }
        if let Some(return_type) = &member.return_type {
            let data_type = types.data_type(return_type)?;
            self.machine
                .component_mut()
                .add_signal(initialized(DataObject::signal(naming::return_value(&name), data_type)));
        }
        Ok(())
    }

    fn emit(&mut self, statement: VhdlStatement) -> Result<(), TransformError> {
        self.machine.state_mut(self.current_state)?.body.push(statement);
        Ok(())
    }

    fn add_cost(&mut self, cycles: f64) -> Result<(), TransformError> {
        self.current_cycles += cycles;
        self.machine.state_mut(self.current_state)?.required_clock_cycles = self.current_cycles;
        Ok(())
    }

    fn switch_to(&mut self, index: usize) {
        self.current_state = index;
        self.current_cycles = 0.0;
        self.terminated = false;
    }

    fn goto(&mut self, index: usize) -> Result<(), TransformError> {
        let statement = self.machine.change_state_to(index);
        self.emit(statement)
    }

    /// Closes the current state and continues in a fresh one.
    fn next_state(&mut self) -> Result<usize, TransformError> {
        let next = self.machine.add_state(Vec::new());
        self.goto(next)?;
        self.switch_to(next);
        Ok(next)
    }

    /// Emits statements costing `cycles` clock cycles in total.
    fn emit_timed(&mut self, statements: Vec<VhdlStatement>, cycles: f64) -> Result<(), TransformError> {
        if self.current_cycles > 0.0 && self.current_cycles + cycles > 1.0 {
            self.next_state()?;
        }
        for statement in statements {
            self.emit(statement)?;
        }
        self.add_cost(cycles)?;
        if cycles > 1.0 {
            // Multi-cycle paths: nothing may read the result until it settled.
            let padding = cycles.ceil() as usize - 1;
            for _ in 0..padding {
                self.next_state()?;
            }
        }
        Ok(())
    }

    fn lower_body(&mut self) -> Result<(), TransformError> {
        let member = self.member;
        self.lower_block(&member.body)?;
        if !self.terminated {
            self.goto(FINAL_STATE_INDEX)?;
        }
        Ok(())
    }

    fn lower_block(&mut self, statements: &'c [Statement]) -> Result<(), TransformError> {
        for statement in statements {
            if self.terminated {
                break;
            }
            self.lower_statement(statement)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, statement: &'c Statement) -> Result<(), TransformError> {
        match statement {
            Statement::Assign { target, value } => {
                let target = self.lower_target(target)?;
                if let Expression::Call { member, arguments } = value {
                    return self.lower_invocation(member, 1, arguments, false, vec![target]);
                }
                let value = self.lower_expression(value)?;
                let cycles = target.cycles + value.cycles;
                let converted = self.convert(value, &target.type_ref)?;
                self.emit_timed(vec![assign(target.vhdl, converted)], cycles)
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => self.lower_if(condition, then_body, else_body),
            Statement::While { condition, body } => self.lower_while(condition, body),
            Statement::Return { value } => self.lower_return(value.as_ref()),
            Statement::Call {
                member,
                arguments,
                result,
            } => {
                let results = match result {
                    Some(target) => vec![self.lower_target(target)?],
                    None => Vec::new(),
                };
                self.lower_invocation(member, 1, arguments, false, results)
            }
            Statement::Parallel {
                member,
                degree,
                arguments,
                results,
                pass_index,
            } => {
                let results = results
                    .iter()
                    .map(|target| self.lower_target(target))
                    .collect::<Result<Vec<_>, _>>()?;
                self.lower_invocation(member, *degree, arguments, *pass_index, results)
            }
            Statement::MemoryRead { cell_index, target } => self.lower_memory_read(cell_index, target),
            Statement::MemoryWrite { cell_index, value } => self.lower_memory_write(cell_index, value),
            Statement::Expression(Expression::Call { member, arguments }) => {
                self.lower_invocation(member, 1, arguments, false, Vec::new())
            }
            Statement::Expression(expression) => {
                // Side-effect free; only checked.
                self.lower_expression(expression).map(|_| ())
            }
        }
    }

    fn lower_condition(&self, condition: &Expression) -> Result<Lowered, TransformError> {
        let lowered = self.lower_expression(condition)?;
        if lowered.type_ref != TypeRef::Bool {
            return Err(self.unsupported(format!("non-boolean condition of type {:?}", lowered.type_ref)));
        }
        Ok(lowered)
    }

    fn lower_if(
        &mut self,
        condition: &'c Expression,
        then_body: &'c [Statement],
        else_body: &'c [Statement],
    ) -> Result<(), TransformError> {
        let condition = self.lower_condition(condition)?;
        if self.current_cycles > 0.0 && self.current_cycles + condition.cycles > 1.0 {
            self.next_state()?;
        }
        self.add_cost(condition.cycles)?;

        let then_state = self.machine.add_state(Vec::new());
        let else_state = if else_body.is_empty() {
            None
        } else {
            Some(self.machine.add_state(Vec::new()))
        };
        let after_state = self.machine.add_state(Vec::new());
        let branch = IfElse::new(condition.vhdl, vec![self.machine.change_state_to(then_state)])
            .with_else(vec![self.machine.change_state_to(else_state.unwrap_or(after_state))]);
        self.emit(branch.into())?;

        self.switch_to(then_state);
        self.lower_block(then_body)?;
        if !self.terminated {
            self.goto(after_state)?;
        }
        if let Some(else_state) = else_state {
            self.switch_to(else_state);
            self.lower_block(else_body)?;
            if !self.terminated {
                self.goto(after_state)?;
            }
        }
        self.switch_to(after_state);
        Ok(())
    }

    fn lower_while(&mut self, condition: &'c Expression, body: &'c [Statement]) -> Result<(), TransformError> {
        let condition_state = self.next_state()?;
        let condition = self.lower_condition(condition)?;
        self.add_cost(condition.cycles)?;

        let body_state = self.machine.add_state(Vec::new());
        let after_state = self.machine.add_state(Vec::new());
        let branch = IfElse::new(condition.vhdl, vec![self.machine.change_state_to(body_state)])
            .with_else(vec![self.machine.change_state_to(after_state)]);
        self.emit(branch.into())?;

        self.switch_to(body_state);
        self.lower_block(body)?;
        if !self.terminated {
            self.goto(condition_state)?;
        }
        self.switch_to(after_state);
        Ok(())
    }

    fn lower_return(&mut self, value: Option<&'c Expression>) -> Result<(), TransformError> {
        if let Some(value) = value {
            let return_type = self
                .member
                .return_type
                .as_ref()
                .ok_or_else(|| self.unsupported("returning a value from a member without return type"))?;
            let target = Lowered {
                vhdl: signal(naming::return_value(self.machine.name())),
                type_ref: return_type.clone(),
                cycles: 0.0,
            };
            if let Expression::Call { member, arguments } = value {
                self.lower_invocation(member, 1, arguments, false, vec![target])?;
            } else {
                let lowered = self.lower_expression(value)?;
                let cycles = lowered.cycles;
                let converted = self.convert(lowered, return_type)?;
                self.emit_timed(vec![assign(target.vhdl, converted)], cycles)?;
            }
        }
        self.goto(FINAL_STATE_INDEX)?;
        self.terminated = true;
        Ok(())
    }

    /// Starts `degree` invocations of `callee_name` through this
    /// component's call slots, then waits until all of them finished.
    /// `results[i]` receives the return value of invocation `i`.
    fn lower_invocation(
        &mut self,
        callee_name: &str,
        degree: u32,
        arguments: &'c [Expression],
        pass_index: bool,
        results: Vec<Lowered>,
    ) -> Result<(), TransformError> {
        let types = self.context.types;
        let callee = self
            .context
            .tree
            .member(callee_name)
            .ok_or_else(|| TransformError::UnknownMember(callee_name.to_string()))?;
        let supplied = arguments.len() + usize::from(pass_index);
        if supplied != callee.parameters.len() {
            return Err(self.unsupported(format!(
                "call to '{}' with {supplied} arguments instead of {}",
                callee.full_name,
                callee.parameters.len()
            )));
        }
        if !results.is_empty() && callee.return_type.is_none() {
            return Err(self.unsupported(format!(
                "using the result of '{}', which returns nothing",
                callee.full_name
            )));
        }
        if results.len() > degree as usize {
            return Err(self.unsupported(format!(
                "more results than invocations of '{}'",
                callee.full_name
            )));
        }

        let name = self.name();
        self.machine
            .component_mut()
            .record_call_instance_count(&callee.full_name, degree);
        let arguments = arguments
            .iter()
            .map(|argument| self.lower_expression(argument))
            .collect::<Result<Vec<_>, _>>()?;
        let cycles = arguments.iter().map(|argument| argument.cycles).sum();
        let slots: Vec<String> = (0..degree)
            .map(|slot| naming::call_slot(&name, &callee.full_name, slot))
            .collect();

        let mut start = Vec::new();
        for (index, slot) in (0i64..).zip(&slots) {
            let mut values = Vec::new();
            for argument in &arguments {
                values.push(argument.clone());
            }
            if pass_index {
                let index_type = callee
                    .parameters
                    .last()
                    .map(|parameter| parameter.type_ref.clone())
                    .ok_or_else(|| InternalError::new("index parameter missing"))?;
                let TypeRef::Int { width, signed } = index_type else {
                    return Err(self.unsupported(format!(
                        "passing the invocation index to a non-integer parameter of '{}'",
                        callee.full_name
                    )));
                };
                values.push(Lowered {
                    vhdl: int_literal(index, width, signed),
                    type_ref: index_type,
                    cycles: 0.0,
                });
            }
            for (parameter, value) in callee.parameters.iter().zip(values) {
                let data_type = types.data_type(&parameter.type_ref)?;
                let converted = self.convert(value, &parameter.type_ref)?;
                let output = self.machine.component_mut().add_signal(initialized(DataObject::signal(
                    naming::parameter_out(slot, &parameter.name),
                    data_type,
                )));
                start.push(assign(output, converted));
            }

            let component = self.machine.component_mut();
            let started = component.add_signal(boolean_signal(naming::started(slot)));
            component.add_incoming_signal(boolean_signal(naming::finished(slot)));
            if let Some(return_type) = &callee.return_type {
                let data_type = types.data_type(return_type)?;
                self.machine
                    .component_mut()
                    .add_incoming_signal(initialized(DataObject::signal(naming::return_value(slot), data_type)));
            }
            start.push(assign(started, Value::Boolean(true)));
        }
        self.emit_timed(start, cycles)?;

        self.next_state()?;
        let mut condition: Option<VhdlExpression> = None;
        let mut done = Vec::new();
        for (index, slot) in slots.iter().enumerate() {
            let finished = signal(naming::finished(slot));
            condition = Some(match condition {
                Some(previous) => VhdlExpression::binary(VhdlBinaryOperator::And, previous, finished),
                None => finished,
            });
            done.push(assign(DataObjectReference::signal(naming::started(slot)), Value::Boolean(false)));
            if let (Some(target), Some(return_type)) = (results.get(index), &callee.return_type) {
                let value = Lowered {
                    vhdl: signal(naming::return_value(slot)),
                    type_ref: return_type.clone(),
                    cycles: 0.0,
                };
                done.push(assign(target.vhdl.clone(), self.convert(value, &target.type_ref)?));
            }
        }
        let condition = condition.ok_or_else(|| InternalError::new("invocation without call slots"))?;
        let after_state = self.machine.add_state(Vec::new());
        done.push(self.machine.change_state_to(after_state));
        self.emit(VhdlStatement::LineComment(format!(
            "Waiting for the invocations of {} to finish.",
            callee.full_name
        )))?;
        self.emit(IfElse::new(condition, done).into())?;
        self.switch_to(after_state);
        Ok(())
    }

    fn require_simple_memory(&mut self) -> Result<(), TransformError> {
        if !self.context.use_simple_memory {
            return Err(self.unsupported("SimpleMemory access while the memory bus is disabled"));
        }
        let name = self.name();
        let width = self.context.data_bus_width_bits();
        let component = self.machine.component_mut();
        component.uses_simple_memory = true;
        component.add_signal(
            DataObject::signal(naming::memory_signal(&name, naming::CELL_INDEX), DataType::Integer)
                .with_initial_value(Value::Integer(0).into()),
        );
        component.add_signal(
            DataObject::signal(naming::memory_signal(&name, naming::DATA_OUT), DataType::std_logic_vector(width))
                .with_initial_value(Value::Others('0').into()),
        );
        component.add_signal(boolean_signal(naming::memory_signal(&name, naming::READ_ENABLE)));
        component.add_signal(boolean_signal(naming::memory_signal(&name, naming::WRITE_ENABLE)));
        Ok(())
    }

    fn memory_signal(&self, port: &str) -> DataObjectReference {
        DataObjectReference::signal(naming::memory_signal(self.machine.name(), port))
    }

    fn lower_cell_index(&self, cell_index: &Expression) -> Result<Lowered, TransformError> {
        let lowered = self.lower_expression(cell_index)?;
        if !matches!(lowered.type_ref, TypeRef::Int { .. }) {
            return Err(self.unsupported("non-integer SimpleMemory cell index"));
        }
        Ok(Lowered {
            vhdl: Invokation::to_integer(lowered.vhdl),
            type_ref: lowered.type_ref,
            cycles: lowered.cycles,
        })
    }

    /// Emits `done` once `acknowledge` is seen, then moves on.
    fn wait_for_memory(&mut self, acknowledge: &str, mut done: Vec<VhdlStatement>) -> Result<(), TransformError> {
        self.next_state()?;
        let after_state = self.machine.add_state(Vec::new());
        done.push(self.machine.change_state_to(after_state));
        self.emit(IfElse::new(signal(acknowledge.to_string()), done).into())?;
        self.switch_to(after_state);
        Ok(())
    }

    fn lower_memory_read(&mut self, cell_index: &Expression, target: &Expression) -> Result<(), TransformError> {
        self.require_simple_memory()?;
        let target = self.lower_target(target)?;
        let TypeRef::Int { width, signed } = target.type_ref else {
            return Err(self.unsupported("reading a non-integer from SimpleMemory"));
        };
        let cell = self.lower_cell_index(cell_index)?;
        let read_enable = self.memory_signal(naming::READ_ENABLE);
        self.emit_timed(
            vec![
                assign(self.memory_signal(naming::CELL_INDEX), cell.vhdl),
                assign(read_enable.clone(), Value::Boolean(true)),
            ],
            cell.cycles + target.cycles,
        )?;

        let data_in = signal(naming::DATA_IN.to_string());
        let data_in = if signed {
            Invokation::signed(data_in)
        } else {
            Invokation::unsigned(data_in)
        };
        self.wait_for_memory(
            naming::READS_DONE,
            vec![
                assign(target.vhdl, Invokation::resize(data_in, width)),
                assign(read_enable, Value::Boolean(false)),
            ],
        )
    }

    fn lower_memory_write(&mut self, cell_index: &Expression, value: &Expression) -> Result<(), TransformError> {
        self.require_simple_memory()?;
        let value = self.lower_expression(value)?;
        if !matches!(value.type_ref, TypeRef::Int { .. }) {
            return Err(self.unsupported("writing a non-integer to SimpleMemory"));
        }
        let cell = self.lower_cell_index(cell_index)?;
        let width = self.context.data_bus_width_bits();
        let write_enable = self.memory_signal(naming::WRITE_ENABLE);
        self.emit_timed(
            vec![
                assign(self.memory_signal(naming::CELL_INDEX), cell.vhdl),
                assign(
                    self.memory_signal(naming::DATA_OUT),
                    Invokation::std_logic_vector(Invokation::resize(value.vhdl, width)),
                ),
                assign(write_enable.clone(), Value::Boolean(true)),
            ],
            cell.cycles + value.cycles,
        )?;
        self.wait_for_memory(naming::WRITES_DONE, vec![assign(write_enable, Value::Boolean(false))])
    }

    /// Lowers an expression that is written to.
    fn lower_target(&self, target: &Expression) -> Result<Lowered, TransformError> {
        if target.root_name().is_none() {
            return Err(self.unsupported(format!("assignment to {target:?}")));
        }
        self.lower_expression(target)
    }

    /// Converts between integer widths and signedness.
    fn convert(&self, value: Lowered, to: &TypeRef) -> Result<VhdlExpression, TransformError> {
        if &value.type_ref == to {
            return Ok(value.vhdl);
        }
        match (&value.type_ref, to) {
            (
                TypeRef::Int {
                    signed: from_signed, ..
                },
                TypeRef::Int { width, signed },
            ) => {
                let resized = Invokation::resize(value.vhdl, *width);
                Ok(match (from_signed, signed) {
                    (false, true) => Invokation::signed(resized),
                    (true, false) => Invokation::unsigned(resized),
                    _ => resized,
                })
            }
            _ => Err(self.unsupported(format!(
                "conversion from {:?} to {:?}",
                value.type_ref, to
            ))),
        }
    }

    fn lower_expression(&self, expression: &Expression) -> Result<Lowered, TransformError> {
        match expression {
            Expression::Literal(literal) => self.lower_literal(literal),
            Expression::Variable(name) | Expression::Parameter(name) => {
                let declaration = self
                    .member
                    .variable(name)
                    .ok_or_else(|| self.unsupported(format!("unknown variable '{name}'")))?;
                Ok(Lowered {
                    vhdl: DataObjectReference::variable(naming::variable(self.machine.name(), name)).into(),
                    type_ref: declaration.type_ref.clone(),
                    cycles: 0.0,
                })
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => self.lower_binary(*operator, left, right),
            Expression::Unary { operator, operand } => self.lower_unary(*operator, operand),
            Expression::Index { array, index } => {
                let array = self.lower_expression(array)?;
                let index = self.lower_expression(index)?;
                let TypeRef::Array { element, .. } = array.type_ref else {
                    return Err(self.unsupported("indexing a value that is not an array"));
                };
                if !matches!(index.type_ref, TypeRef::Int { .. }) {
                    return Err(self.unsupported("non-integer array index"));
                }
                Ok(Lowered {
                    vhdl: VhdlExpression::index(array.vhdl, Invokation::to_integer(index.vhdl)),
                    type_ref: *element,
                    cycles: array.cycles + index.cycles,
                })
            }
            Expression::Field { target, field } => {
                let target = self.lower_expression(target)?;
                let TypeRef::Named(record) = &target.type_ref else {
                    return Err(self.unsupported(format!("field '{field}' of a value that is not a record")));
                };
                let type_ref = self.context.types.field_type(record, field)?.clone();
                Ok(Lowered {
                    vhdl: VhdlExpression::field(target.vhdl, field.clone()),
                    type_ref,
                    cycles: target.cycles,
                })
            }
            Expression::Call { member, .. } => Err(self.unsupported(format!(
                "call to '{member}' nested in an expression"
            ))),
        }
    }

    fn lower_literal(&self, literal: &Literal) -> Result<Lowered, TransformError> {
        let (vhdl, type_ref) = match literal {
            Literal::Bool(value) => (Value::Boolean(*value).into(), TypeRef::Bool),
            Literal::Int { value, width, signed } => (
                int_literal(*value, *width, *signed),
                TypeRef::Int {
                    width: *width,
                    signed: *signed,
                },
            ),
            Literal::EnumVariant { enum_name, variant } => (
                VhdlExpression::EnumValue(enum_literal(enum_name, variant)),
                TypeRef::Named(enum_name.clone()),
            ),
        };
        Ok(Lowered {
            vhdl,
            type_ref,
            cycles: 0.0,
        })
    }

    fn lower_binary(
        &self,
        operator: BinaryOperator,
        left: &Expression,
        right: &Expression,
    ) -> Result<Lowered, TransformError> {
        let left_lowered = self.lower_expression(left)?;
        let right_lowered = self.lower_expression(right)?;
        let (width, is_signed) = match left_lowered.type_ref.operand_shape() {
            Some(shape) => shape,
            None if matches!(operator, BinaryOperator::Equality | BinaryOperator::Inequality) => (1, false),
            None => {
                return Err(self.unsupported(format!(
                    "operator {operator:?} on a value of type {:?}",
                    left_lowered.type_ref
                )))
            }
        };

        let mut operation = BinaryOperation::new(operator, width, is_signed);
        if let Expression::Literal(Literal::Int { value, .. }) = right {
            operation = operation.with_constant_right_operand(*value);
        }
        let cycles = left_lowered.cycles
            + right_lowered.cycles
            + self
                .context
                .device_driver
                .clock_cycles_needed_for_binary_operation(&operation);

        let Some(vhdl_operator) = vhdl_operator(operator) else {
            if !matches!(right_lowered.type_ref, TypeRef::Int { .. }) || left_lowered.type_ref == TypeRef::Bool {
                return Err(self.unsupported("shift with a non-integer operand"));
            }
            let function = if operator == BinaryOperator::ShiftLeft {
                "shift_left"
            } else {
                "shift_right"
            };
            return Ok(Lowered {
                vhdl: Invokation::new(
                    function,
                    vec![left_lowered.vhdl, Invokation::to_integer(right_lowered.vhdl)],
                )
                .into(),
                type_ref: left_lowered.type_ref,
                cycles,
            });
        };

        let is_arithmetic = !operator.is_comparison()
            && !matches!(
                operator,
                BinaryOperator::And | BinaryOperator::Or | BinaryOperator::ExclusiveOr
            );
        if is_arithmetic && left_lowered.type_ref == TypeRef::Bool {
            return Err(self.unsupported(format!("arithmetic operator {operator:?} on booleans")));
        }

        let left_type = left_lowered.type_ref.clone();
        let right_vhdl = self.convert(right_lowered, &left_type)?;
        let expression = VhdlExpression::binary(vhdl_operator, left_lowered.vhdl, right_vhdl);
        let (vhdl, type_ref) = if operator.is_comparison() {
            (expression, TypeRef::Bool)
        } else if operator == BinaryOperator::Multiply {
            // numeric_std multiplication doubles the width.
            (Invokation::resize(expression, width), left_type)
        } else {
            (expression, left_type)
        };
        Ok(Lowered { vhdl, type_ref, cycles })
    }

    fn lower_unary(&self, operator: UnaryOperator, operand: &Expression) -> Result<Lowered, TransformError> {
        let operand = self.lower_expression(operand)?;
        let (width, is_signed) = operand
            .type_ref
            .operand_shape()
            .ok_or_else(|| self.unsupported(format!("operator {operator:?} on a composite value")))?;
        let vhdl_operator = match operator {
            UnaryOperator::Not => VhdlUnaryOperator::Not,
            UnaryOperator::Negate if is_signed => VhdlUnaryOperator::Negation,
            UnaryOperator::Negate => return Err(self.unsupported("negation of an unsigned value")),
        };
        let cycles = operand.cycles
            + self
                .context
                .device_driver
                .clock_cycles_needed_for_unary_operation(operator, width, is_signed);
        Ok(Lowered {
            vhdl: VhdlExpression::unary(vhdl_operator, operand.vhdl),
            type_ref: operand.type_ref,
            cycles,
        })
    }
}
