//! Arbitration of the SimpleMemory bus.
//!
//! Components drive private copies of the bus outputs. The proxy ORs their
//! enables together and forwards the address and data of whichever
//! component currently requests access. Only one component may access the
//! bus at a time.

use crate::architecture_component::ArchitectureComponent;
use crate::naming;
use hast_vhdl::{
    BinaryOperator, ConditionalSignalAssignment, DataObjectReference, Expression, SignalAssignmentWhen,
    Statement, Value,
};

fn component_signal(component: &ArchitectureComponent, port: &str) -> Expression {
    DataObjectReference::signal(naming::memory_signal(&component.name, port)).into()
}

fn or_all(components: &[&ArchitectureComponent], port: &str) -> Expression {
    components
        .iter()
        .map(|component| component_signal(component, port))
        .reduce(|left, right| Expression::binary(BinaryOperator::Or, left, right))
        .unwrap_or(Expression::Value(Value::Boolean(false)))
}

fn multiplex(
    components: &[&ArchitectureComponent],
    port: &str,
    selected_by: &[&str],
    otherwise: Value,
) -> Statement {
    let whens = components
        .iter()
        .map(|component| SignalAssignmentWhen {
            value: component_signal(component, port),
            condition: selected_by
                .iter()
                .map(|enable| component_signal(component, enable))
                .reduce(|left, right| Expression::binary(BinaryOperator::Or, left, right))
                .unwrap_or(Expression::Value(Value::Boolean(false))),
        })
        .collect();
    Statement::ConditionalSignalAssignment(ConditionalSignalAssignment {
        target: DataObjectReference::signal(port),
        whens,
        else_value: otherwise.into(),
    })
}

/// Concurrent statements driving the SimpleMemory output ports from the
/// components that use the bus.
pub fn build_memory_proxy(components: &[&ArchitectureComponent]) -> Vec<Statement> {
    let users: Vec<&ArchitectureComponent> = components
        .iter()
        .copied()
        .filter(|component| component.uses_simple_memory)
        .collect();

    vec![
        Statement::LineComment("SimpleMemory bus arbitration".to_string()),
        Statement::assign(
            DataObjectReference::signal(naming::READ_ENABLE),
            or_all(&users, naming::READ_ENABLE),
        ),
        Statement::assign(
            DataObjectReference::signal(naming::WRITE_ENABLE),
            or_all(&users, naming::WRITE_ENABLE),
        ),
        multiplex(
            &users,
            naming::CELL_INDEX,
            &[naming::READ_ENABLE, naming::WRITE_ENABLE],
            Value::Integer(0),
        ),
        multiplex(&users, naming::DATA_OUT, &[naming::WRITE_ENABLE], Value::Others('0')),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hast_vhdl::{Render, VhdlGenerationOptions};

    fn component(name: &str, uses_simple_memory: bool) -> ArchitectureComponent {
        let mut component = ArchitectureComponent::new(name);
        component.uses_simple_memory = uses_simple_memory;
        component
    }

    fn render(statements: &[Statement]) -> String {
        statements.to_vhdl(&VhdlGenerationOptions::debug())
    }

    #[test]
    fn enables_are_ored() {
        let a = component("A.0", true);
        let b = component("B.0", true);
        let vhdl = render(&build_memory_proxy(&[&a, &b]));
        assert!(vhdl.contains("ReadEnable <= (\\A.0.ReadEnable\\ or \\B.0.ReadEnable\\);"));
        assert!(vhdl.contains("WriteEnable <= (\\A.0.WriteEnable\\ or \\B.0.WriteEnable\\);"));
    }

    #[test]
    fn address_and_data_follow_the_active_component() {
        let a = component("A.0", true);
        let vhdl = render(&build_memory_proxy(&[&a]));
        assert!(vhdl.contains(
            "CellIndex <= \\A.0.CellIndex\\ when (\\A.0.ReadEnable\\ or \\A.0.WriteEnable\\) else 0;"
        ));
        assert!(vhdl.contains("DataOut <= \\A.0.DataOut\\ when \\A.0.WriteEnable\\ else (others => '0');"));
    }

    #[test]
    fn components_without_memory_access_are_skipped() {
        let idle = component("Idle.0", false);
        let vhdl = render(&build_memory_proxy(&[&idle]));
        assert!(!vhdl.contains("Idle.0"));
        assert!(vhdl.contains("ReadEnable <= false;"));
        assert!(vhdl.contains("CellIndex <= 0;"));
    }
}
