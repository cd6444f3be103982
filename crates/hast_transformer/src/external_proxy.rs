//! The process dispatching host invocations.
//!
//! The host selects an entry point through the `MemberId` port and raises
//! `Started`. The proxy starts instance 0 of that member, raises
//! `Finished` once the member finished, and holds it until the host lowers
//! `Started` again.

use crate::error::TransformError;
use crate::member_id_table::MemberIdTable;
use crate::naming;
use hast_vhdl::{
    Case, CaseWhen, DataObject, DataObjectReference, DataType, ElseIf, Expression, IfElse,
    Invokation, Process, Statement, UnaryOperator, Value,
};

const RUNNING: &str = "running";
const FINISHING: &str = "finishing";

fn variable(name: &str) -> DataObjectReference {
    DataObjectReference::variable(name)
}

fn set(target: DataObjectReference, value: bool) -> Statement {
    Statement::assign(target, Value::Boolean(value))
}

fn not(reference: DataObjectReference) -> Expression {
    Expression::unary(UnaryOperator::Not, reference.into())
}

/// Builds the external invocation proxy for the given entry points.
///
/// Entry points are dispatched in the order given, under the ID the table
/// assigns them. An unknown `MemberId` finishes immediately.
pub fn build_external_invocation_proxy(
    entry_points: &[String],
    member_id_table: &MemberIdTable,
) -> Result<Process, TransformError> {
    if entry_points.is_empty() {
        return Err(TransformError::NoInterfaceMembers);
    }

    let mut dispatch = Vec::with_capacity(entry_points.len());
    for member in entry_points {
        let id = member_id_table
            .id_of(member)
            .ok_or_else(|| TransformError::UnknownMember(member.clone()))?;
        dispatch.push((Value::Integer(i64::from(id)), naming::component_name(member, 0)));
    }

    let started = DataObjectReference::signal(naming::STARTED);
    let finished = DataObjectReference::signal(naming::FINISHED);
    let member_id: Expression = DataObjectReference::signal(naming::MEMBER_ID).into();
    let finish = vec![set(finished.clone(), true), set(variable(FINISHING), true)];

    let mut reset = vec![
        Statement::LineComment("Synchronous reset".to_string()),
        set(finished.clone(), false),
        set(variable(RUNNING), false),
        set(variable(FINISHING), false),
    ];
    let mut start_whens = Vec::new();
    let mut wait_whens = Vec::new();
    for (id, component) in &dispatch {
        let member_started = DataObjectReference::signal(naming::started(component));
        let member_finished = DataObjectReference::signal(naming::finished(component));
        reset.push(set(member_started.clone(), false));
        start_whens.push(CaseWhen {
            choice: Some(id.clone().into()),
            body: vec![set(member_started.clone(), true)],
        });
        let mut done = vec![set(member_started, false)];
        done.extend(finish.iter().cloned());
        wait_whens.push(CaseWhen {
            choice: Some(id.clone().into()),
            body: vec![IfElse::new(member_finished.into(), done).into()],
        });
    }
    start_whens.push(CaseWhen {
        choice: None,
        body: vec![Statement::Null],
    });
    wait_whens.push(CaseWhen {
        choice: None,
        body: finish,
    });

    let start = IfElse::new(
        started.clone().into(),
        vec![
            set(variable(RUNNING), true),
            Case {
                expression: member_id.clone(),
                whens: start_whens,
            }
            .into(),
        ],
    );
    let release = IfElse::new(
        not(started),
        vec![
            set(finished, false),
            set(variable(RUNNING), false),
            set(variable(FINISHING), false),
        ],
    );
    let handshake = IfElse {
        condition: not(variable(RUNNING)),
        true_body: vec![start.into()],
        else_ifs: vec![ElseIf {
            condition: not(variable(FINISHING)),
            body: vec![Case {
                expression: member_id,
                whens: wait_whens,
            }
            .into()],
        }],
        else_body: vec![release.into()],
    };

    let reset = IfElse::new(
        Expression::equals(
            DataObjectReference::signal(naming::RESET).into(),
            Value::StdLogic('1').into(),
        ),
        reset,
    )
    .with_else(vec![handshake.into()]);

    let mut process = Process::new(naming::EXTERNAL_PROXY_PROCESS);
    for name in [RUNNING, FINISHING] {
        process.declarations.push(
            DataObject::variable(name, DataType::Boolean)
                .with_initial_value(Value::Boolean(false).into())
                .into(),
        );
    }
    process.body.push(
        IfElse::new(
            Invokation::rising_edge(DataObjectReference::signal(naming::CLOCK).into()),
            vec![reset.into()],
        )
        .into(),
    );
    Ok(process)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Member;
    use hast_vhdl::{Render, VhdlGenerationOptions};

    fn table(names: &[&str]) -> MemberIdTable {
        let members: Vec<Member> = names
            .iter()
            .map(|name| {
                let mut member = Member::new(*name);
                member.is_interface = true;
                member
            })
            .collect();
        MemberIdTable::build(&members).unwrap()
    }

    #[test]
    fn no_entry_points_is_an_error() {
        let result = build_external_invocation_proxy(&[], &table(&[]));
        assert!(matches!(result, Err(TransformError::NoInterfaceMembers)));
    }

    #[test]
    fn dispatches_by_member_id() {
        let names = ["Calc::Add()".to_string(), "Calc::Sub()".to_string()];
        let table = table(&["Calc::Add()", "Calc::Sub()"]);
        let process = build_external_invocation_proxy(&names, &table).unwrap();
        let vhdl = process.to_vhdl(&VhdlGenerationOptions::debug());
        assert!(vhdl.starts_with("ExternalInvocationProxy: process is\n"));
        assert!(vhdl.contains("variable running: boolean := false;"));
        assert!(vhdl.contains("case MemberId is"));
        assert!(vhdl.contains("when 0 =>\n"));
        assert!(vhdl.contains("\\Calc::Add().0._Started\\ <= true;"));
        assert!(vhdl.contains("when 1 =>\n"));
        assert!(vhdl.contains("if (\\Calc::Sub().0._Finished\\) then"));
        assert!(vhdl.contains("elsif (not finishing) then"));
        assert!(vhdl.contains("if (not Started) then"));
        assert!(vhdl.contains("when others =>\n"));
    }

    #[test]
    fn reset_lowers_every_started_signal() {
        let names = ["A()".to_string(), "B()".to_string()];
        let process = build_external_invocation_proxy(&names, &table(&["A()", "B()"])).unwrap();
        let vhdl = process.to_vhdl(&VhdlGenerationOptions::debug());
        let reset = &vhdl[vhdl.find("Synchronous reset").unwrap()..vhdl.find("else").unwrap()];
        assert!(reset.contains("Finished <= false;"));
        assert!(reset.contains("\\A().0._Started\\ <= false;"));
        assert!(reset.contains("\\B().0._Started\\ <= false;"));
    }

    #[test]
    fn entry_points_must_have_ids() {
        let names = ["Missing()".to_string()];
        let result = build_external_invocation_proxy(&names, &table(&["A()"]));
        assert!(matches!(result, Err(TransformError::UnknownMember(name)) if name == "Missing()"));
    }
}
