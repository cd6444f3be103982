//! Verification passes run before any hardware is generated.
//!
//! Each pass walks the whole tree and fails on the first offence, so the
//! reported error is deterministic for a given tree.

use crate::error::TransformError;
use crate::tree::{Expression, Literal, Member, Statement, SyntaxTree, TypeDefinition, TypeRef};

/// Runs every pass in order.
pub fn verify(tree: &SyntaxTree) -> Result<(), TransformError> {
    reject_dynamically_sized_arrays(tree)?;
    reject_multi_dimensional_arrays(tree)?;
    reject_static_mutable_fields(tree)?;
    reject_captured_variable_mutation(tree)?;
    check_references(tree)?;
    check_invocation_shapes(tree)?;
    Ok(())
}

/// Every type reference in the tree, paired with the name of its owner.
fn type_references(tree: &SyntaxTree) -> Vec<(&str, &TypeRef)> {
    let mut references = Vec::new();
    for definition in &tree.types {
        if let TypeDefinition::Record { name, fields } = definition {
            references.extend(fields.iter().map(|field| (name.as_str(), &field.type_ref)));
        }
    }
    for member in &tree.members {
        references.extend(
            member
                .declared_types()
                .map(|type_ref| (member.full_name.as_str(), type_ref)),
        );
    }
    references
}

fn find_in_type<'a>(type_ref: &'a TypeRef, predicate: &impl Fn(&TypeRef) -> bool) -> Option<&'a TypeRef> {
    if predicate(type_ref) {
        return Some(type_ref);
    }
    match type_ref {
        TypeRef::Array { element, .. } => find_in_type(element, predicate),
        _ => None,
    }
}

fn reject_dynamically_sized_arrays(tree: &SyntaxTree) -> Result<(), TransformError> {
    let is_dynamic = |type_ref: &TypeRef| matches!(type_ref, TypeRef::Array { length: None, .. });
    for (owner, type_ref) in type_references(tree) {
        if find_in_type(type_ref, &is_dynamic).is_some() {
            return Err(TransformError::unsupported(
                owner,
                "dynamically sized array; array lengths must be compile-time constants",
            ));
        }
    }
    Ok(())
}

fn reject_multi_dimensional_arrays(tree: &SyntaxTree) -> Result<(), TransformError> {
    let is_nested = |type_ref: &TypeRef| {
        matches!(type_ref, TypeRef::Array { element, .. } if matches!(**element, TypeRef::Array { .. }))
    };
    for (owner, type_ref) in type_references(tree) {
        if find_in_type(type_ref, &is_nested).is_some() {
            return Err(TransformError::unsupported(owner, "multi-dimensional array"));
        }
    }
    Ok(())
}

fn reject_static_mutable_fields(tree: &SyntaxTree) -> Result<(), TransformError> {
    for member in &tree.members {
        if let Some(field) = &member.reads_static_mutable_field {
            return Err(TransformError::unsupported(
                &member.full_name,
                format!("access to mutable static field '{field}'"),
            ));
        }
    }
    Ok(())
}

fn reject_captured_variable_mutation(tree: &SyntaxTree) -> Result<(), TransformError> {
    for member in tree.members.iter().filter(|member| member.is_compiler_generated) {
        let mut offence = None;
        member.for_each_statement(&mut |statement| {
            if offence.is_some() {
                return;
            }
            offence = statement
                .assigned_targets()
                .into_iter()
                .filter_map(Expression::root_name)
                .find(|name| member.captured_variables.iter().any(|captured| captured == name));
        });
        if let Some(variable) = offence {
            return Err(TransformError::CapturedVariableMutation {
                member: member.full_name.clone(),
                variable: variable.to_string(),
            });
        }
    }
    Ok(())
}

fn check_type_exists(tree: &SyntaxTree, type_ref: &TypeRef) -> Result<(), TransformError> {
    match type_ref {
        TypeRef::Named(name) if tree.type_definition(name).is_none() => {
            Err(TransformError::UnknownType(name.clone()))
        }
        TypeRef::Array { element, .. } => check_type_exists(tree, element),
        _ => Ok(()),
    }
}

fn check_references(tree: &SyntaxTree) -> Result<(), TransformError> {
    for (_, type_ref) in type_references(tree) {
        check_type_exists(tree, type_ref)?;
    }
    for member in &tree.members {
        let mut result = Ok(());
        member.for_each_statement(&mut |statement| {
            if result.is_err() {
                return;
            }
            result = check_statement_references(tree, statement);
        });
        result?;
    }
    Ok(())
}

fn check_statement_references(tree: &SyntaxTree, statement: &Statement) -> Result<(), TransformError> {
    match statement {
        Statement::Call { member, .. } | Statement::Parallel { member, .. }
            if tree.member(member).is_none() =>
        {
            return Err(TransformError::UnknownMember(member.clone()));
        }
        _ => {}
    }
    for expression in statement.expressions() {
        let mut result = Ok(());
        expression.for_each(&mut |nested| {
            if result.is_err() {
                return;
            }
            result = match nested {
                Expression::Call { member, .. } if tree.member(member).is_none() => {
                    Err(TransformError::UnknownMember(member.clone()))
                }
                Expression::Literal(Literal::EnumVariant { enum_name, .. })
                    if !matches!(tree.type_definition(enum_name), Some(TypeDefinition::Enum { .. })) =>
                {
                    Err(TransformError::UnknownType(enum_name.clone()))
                }
                _ => Ok(()),
            };
        });
        result?;
    }
    Ok(())
}

/// Entry points receive their input through SimpleMemory, so they take no
/// parameters; parallel invocations need at least one instance.
fn check_invocation_shapes(tree: &SyntaxTree) -> Result<(), TransformError> {
    for member in tree.interface_members() {
        if let Some(parameter) = member.parameters.first() {
            return Err(TransformError::unsupported(
                &member.full_name,
                format!("parameter '{}' on a hardware entry point", parameter.name),
            ));
        }
    }
    for member in &tree.members {
        check_parallel_degrees(member)?;
    }
    Ok(())
}

fn check_parallel_degrees(member: &Member) -> Result<(), TransformError> {
    let mut result = Ok(());
    member.for_each_statement(&mut |statement| {
        if let Statement::Parallel {
            member: callee,
            degree: 0,
            ..
        } = statement
        {
            if result.is_ok() {
                result = Err(TransformError::unsupported(
                    &member.full_name,
                    format!("parallel invocation of '{callee}' with degree 0"),
                ));
            }
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::VariableDeclaration;

    fn tree_with(member: Member) -> SyntaxTree {
        SyntaxTree {
            types: Vec::new(),
            members: vec![member],
        }
    }

    #[test]
    fn accepts_simple_member() {
        let mut member = Member::new("Samples.Calc::Run()");
        member.is_interface = true;
        member.locals.push(VariableDeclaration::new("x", TypeRef::array(TypeRef::uint32(), 4)));
        assert!(verify(&tree_with(member)).is_ok());
    }

    #[test]
    fn rejects_dynamic_array() {
        let mut member = Member::new("Samples.Calc::Run()");
        member.locals.push(VariableDeclaration::new(
            "buffer",
            TypeRef::Array {
                element: Box::new(TypeRef::uint32()),
                length: None,
            },
        ));
        let err = verify(&tree_with(member)).unwrap_err();
        assert!(err.to_string().contains("dynamically sized array"));
    }

    #[test]
    fn rejects_multi_dimensional_array() {
        let mut member = Member::new("Samples.Matrix::Run()");
        member.locals.push(VariableDeclaration::new(
            "matrix",
            TypeRef::array(TypeRef::array(TypeRef::uint32(), 4), 4),
        ));
        let err = verify(&tree_with(member)).unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedConstruct { ref construct, .. } if construct == "multi-dimensional array"));
    }

    #[test]
    fn dynamic_check_runs_before_multi_dimensional_check() {
        let mut member = Member::new("Samples.Matrix::Run()");
        member.locals.push(VariableDeclaration::new(
            "matrix",
            TypeRef::array(
                TypeRef::Array {
                    element: Box::new(TypeRef::uint32()),
                    length: None,
                },
                4,
            ),
        ));
        let err = verify(&tree_with(member)).unwrap_err();
        assert!(err.to_string().contains("dynamically sized"));
    }

    #[test]
    fn rejects_static_mutable_field() {
        let mut member = Member::new("Samples.Counter::Next()");
        member.reads_static_mutable_field = Some("Samples.Counter::_count".to_string());
        let err = verify(&tree_with(member)).unwrap_err();
        assert!(err.to_string().contains("Samples.Counter::_count"));
    }

    #[test]
    fn rejects_captured_variable_mutation() {
        let mut lambda = Member::new("Samples.Parallel/<>c__DisplayClass0::<Run>b__0()");
        lambda.is_compiler_generated = true;
        lambda.locals.push(VariableDeclaration::new("sum", TypeRef::uint32()));
        lambda.captured_variables.push("sum".to_string());
        lambda.body = vec![Statement::assign(Expression::variable("sum"), Expression::uint32(1))];
        let err = verify(&tree_with(lambda)).unwrap_err();
        assert!(matches!(
            err,
            TransformError::CapturedVariableMutation { ref variable, .. } if variable == "sum"
        ));
    }

    #[test]
    fn captured_variable_reads_are_fine() {
        let mut lambda = Member::new("Samples.Parallel/<>c__DisplayClass0::<Run>b__0()");
        lambda.is_compiler_generated = true;
        lambda.locals.push(VariableDeclaration::new("sum", TypeRef::uint32()));
        lambda.locals.push(VariableDeclaration::new("copy", TypeRef::uint32()));
        lambda.captured_variables.push("sum".to_string());
        lambda.body = vec![Statement::assign(Expression::variable("copy"), Expression::variable("sum"))];
        assert!(verify(&tree_with(lambda)).is_ok());
    }

    #[test]
    fn rejects_unknown_callee() {
        let mut member = Member::new("Samples.Calc::Run()");
        member.body = vec![Statement::If {
            condition: Expression::boolean(true),
            then_body: vec![Statement::call("Samples.Missing::Run()")],
            else_body: Vec::new(),
        }];
        let err = verify(&tree_with(member)).unwrap_err();
        assert!(matches!(err, TransformError::UnknownMember(ref name) if name == "Samples.Missing::Run()"));
    }

    #[test]
    fn rejects_unknown_type() {
        let mut member = Member::new("Samples.Calc::Run()");
        member.locals.push(VariableDeclaration::new("p", TypeRef::Named("Point".to_string())));
        let err = verify(&tree_with(member)).unwrap_err();
        assert!(matches!(err, TransformError::UnknownType(ref name) if name == "Point"));
    }

    #[test]
    fn rejects_entry_point_parameters() {
        let mut member = Member::new("Samples.Calc::Run(u32)");
        member.is_interface = true;
        member.parameters.push(VariableDeclaration::new("input", TypeRef::uint32()));
        let err = verify(&tree_with(member)).unwrap_err();
        assert!(err.to_string().contains("parameter 'input'"));
    }

    #[test]
    fn rejects_zero_degree_parallelism() {
        let mut callee = Member::new("Samples.Task::Run()");
        callee.is_compiler_generated = true;
        let mut member = Member::new("Samples.Calc::Run()");
        member.body = vec![Statement::Parallel {
            member: callee.full_name.clone(),
            degree: 0,
            arguments: Vec::new(),
            results: Vec::new(),
            pass_index: false,
        }];
        let tree = SyntaxTree {
            types: Vec::new(),
            members: vec![member, callee],
        };
        assert!(verify(&tree).is_err());
    }
}
