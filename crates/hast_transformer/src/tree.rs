//! The cleaned syntax tree the transformer consumes.
//!
//! The front-end that produces it (parsing, dead code removal, suitability
//! checks) lives elsewhere; this module only fixes its shape. Every node is
//! serde-deserializable so trees can be fed in as JSON.

use hast_device::{BinaryOperator, UnaryOperator};
use serde::{Deserialize, Serialize};

/// A whole program after cleaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxTree {
    /// Named value types.
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
    /// Every member that survived cleaning.
    pub members: Vec<Member>,
}

impl SyntaxTree {
    /// Looks up a member by full name or alias.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|member| member.full_name == name || member.aliases.iter().any(|a| a == name))
    }

    /// Looks up a named type.
    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|definition| definition.name() == name)
    }

    /// Members marked as hardware entry points.
    pub fn interface_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|member| member.is_interface)
    }
}

/// A flat value type or enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDefinition {
    /// A struct of scalar or array fields.
    Record {
        /// Type name.
        name: String,
        /// Fields in declaration order.
        fields: Vec<VariableDeclaration>,
    },
    /// An enumeration.
    Enum {
        /// Type name.
        name: String,
        /// Variant names in declaration order.
        variants: Vec<String>,
    },
}

impl TypeDefinition {
    /// The type's name.
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Record { name, .. } | TypeDefinition::Enum { name, .. } => name,
        }
    }
}

/// A reference to a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeRef {
    /// `bool`.
    Bool,
    /// A sized integer.
    Int {
        /// Width in bits.
        width: u32,
        /// Signedness.
        signed: bool,
    },
    /// A fixed-length array. A missing length marks a dynamically sized
    /// array, which verification rejects.
    Array {
        /// Element type.
        element: Box<TypeRef>,
        /// Number of elements.
        length: Option<u32>,
    },
    /// A [`TypeDefinition`] by name.
    Named(String),
}

impl TypeRef {
    /// A 32-bit unsigned integer.
    pub fn uint32() -> Self {
        TypeRef::Int {
            width: 32,
            signed: false,
        }
    }

    /// A 32-bit signed integer.
    pub fn int32() -> Self {
        TypeRef::Int {
            width: 32,
            signed: true,
        }
    }

    /// A fixed-length array of `element`.
    pub fn array(element: TypeRef, length: u32) -> Self {
        TypeRef::Array {
            element: Box::new(element),
            length: Some(length),
        }
    }

    /// Operand width and signedness as the device driver sees them.
    /// Booleans count as one unsigned bit.
    pub fn operand_shape(&self) -> Option<(u32, bool)> {
        match self {
            TypeRef::Bool => Some((1, false)),
            TypeRef::Int { width, signed } => Some((*width, *signed)),
            _ => None,
        }
    }
}

/// A named, typed slot: parameter, local variable or record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Name, unique within its scope.
    pub name: String,
    /// Type.
    pub type_ref: TypeRef,
}

impl VariableDeclaration {
    /// Creates a declaration.
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
        }
    }
}

/// A method or other callable member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Fully qualified name; the stable key used everywhere.
    pub full_name: String,
    /// Alternative names resolving to the same member, such as the name of
    /// an async wrapper.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Whether the host may start this member.
    #[serde(default)]
    pub is_interface: bool,
    /// Parameters in call order.
    #[serde(default)]
    pub parameters: Vec<VariableDeclaration>,
    /// Return type; `None` for members returning nothing.
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    /// Local variables.
    #[serde(default)]
    pub locals: Vec<VariableDeclaration>,
    /// Body.
    #[serde(default)]
    pub body: Vec<Statement>,
    /// Set on lambda bodies the compiler generated for parallel tasks.
    #[serde(default)]
    pub is_compiler_generated: bool,
    /// Parameters or locals that alias a variable of the enclosing member.
    #[serde(default)]
    pub captured_variables: Vec<String>,
    /// Name of a mutable static field the member reads, if any.
    #[serde(default)]
    pub reads_static_mutable_field: Option<String>,
}

impl Member {
    /// An empty, non-interface member.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            aliases: Vec::new(),
            is_interface: false,
            parameters: Vec::new(),
            return_type: None,
            locals: Vec::new(),
            body: Vec::new(),
            is_compiler_generated: false,
            captured_variables: Vec::new(),
            reads_static_mutable_field: None,
        }
    }

    /// Looks up a local variable or parameter.
    pub fn variable(&self, name: &str) -> Option<&VariableDeclaration> {
        self.locals
            .iter()
            .chain(self.parameters.iter())
            .find(|declaration| declaration.name == name)
    }

    /// Every type the member mentions in its signature and locals.
    pub fn declared_types(&self) -> impl Iterator<Item = &TypeRef> {
        self.parameters
            .iter()
            .chain(self.locals.iter())
            .map(|declaration| &declaration.type_ref)
            .chain(self.return_type.iter())
    }

    /// Calls `visit` on every statement of the body, nested ones included.
    pub fn for_each_statement<'a>(&'a self, visit: &mut impl FnMut(&'a Statement)) {
        for statement in &self.body {
            statement.for_each(visit);
        }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `target = value;`
    Assign {
        /// A variable, parameter, array element or record field.
        target: Expression,
        /// The assigned value.
        value: Expression,
    },
    /// `if (condition) { .. } else { .. }`
    If {
        /// Condition.
        condition: Expression,
        /// Taken branch.
        #[serde(default)]
        then_body: Vec<Statement>,
        /// Other branch.
        #[serde(default)]
        else_body: Vec<Statement>,
    },
    /// `while (condition) { .. }`
    While {
        /// Loop condition.
        condition: Expression,
        /// Loop body.
        #[serde(default)]
        body: Vec<Statement>,
    },
    /// `return value;`
    Return {
        /// Returned value.
        #[serde(default)]
        value: Option<Expression>,
    },
    /// A call awaited in place, optionally storing the return value.
    Call {
        /// Callee full name or alias.
        member: String,
        /// Arguments in parameter order.
        #[serde(default)]
        arguments: Vec<Expression>,
        /// Where the return value goes.
        #[serde(default)]
        result: Option<Expression>,
    },
    /// Starts `degree` concurrent invocations of `member` and awaits all.
    Parallel {
        /// Callee full name or alias.
        member: String,
        /// Number of concurrent invocations.
        degree: u32,
        /// Arguments shared by every invocation.
        #[serde(default)]
        arguments: Vec<Expression>,
        /// Where each invocation's return value goes, in invocation order.
        #[serde(default)]
        results: Vec<Expression>,
        /// Pass the invocation index as an extra last argument.
        #[serde(default)]
        pass_index: bool,
    },
    /// Reads one SimpleMemory cell.
    MemoryRead {
        /// Cell to read.
        cell_index: Expression,
        /// Where the cell's value goes.
        target: Expression,
    },
    /// Writes one SimpleMemory cell.
    MemoryWrite {
        /// Cell to write.
        cell_index: Expression,
        /// Value written.
        value: Expression,
    },
    /// An expression evaluated for its side effects.
    Expression(Expression),
}

impl Statement {
    /// `target = value;`
    pub fn assign(target: Expression, value: Expression) -> Self {
        Statement::Assign { target, value }
    }

    /// A call without arguments or result.
    pub fn call(member: impl Into<String>) -> Self {
        Statement::Call {
            member: member.into(),
            arguments: Vec::new(),
            result: None,
        }
    }

    /// Calls `visit` on this statement and every nested one, pre-order.
    pub fn for_each<'a>(&'a self, visit: &mut impl FnMut(&'a Statement)) {
        visit(self);
        match self {
            Statement::If {
                then_body,
                else_body,
                ..
            } => {
                for statement in then_body.iter().chain(else_body.iter()) {
                    statement.for_each(visit);
                }
            }
            Statement::While { body, .. } => {
                for statement in body {
                    statement.for_each(visit);
                }
            }
            _ => {}
        }
    }

    /// Expressions directly owned by this statement.
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            Statement::Assign { target, value } => vec![target, value],
            Statement::If { condition, .. } | Statement::While { condition, .. } => vec![condition],
            Statement::Return { value } => value.iter().collect(),
            Statement::Call {
                arguments, result, ..
            } => arguments.iter().chain(result.iter()).collect(),
            Statement::Parallel {
                arguments, results, ..
            } => arguments.iter().chain(results.iter()).collect(),
            Statement::MemoryRead { cell_index, target } => vec![cell_index, target],
            Statement::MemoryWrite { cell_index, value } => vec![cell_index, value],
            Statement::Expression(expression) => vec![expression],
        }
    }

    /// Expressions this statement writes to.
    pub fn assigned_targets(&self) -> Vec<&Expression> {
        match self {
            Statement::Assign { target, .. } | Statement::MemoryRead { target, .. } => vec![target],
            Statement::Call { result, .. } => result.iter().collect(),
            Statement::Parallel { results, .. } => results.iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// A constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// `true` or `false`.
    Bool(bool),
    /// A sized integer constant.
    Int {
        /// The value.
        value: i64,
        /// Width in bits.
        width: u32,
        /// Signedness.
        signed: bool,
    },
    /// A variant of a named enum.
    EnumVariant {
        /// The enum's type name.
        enum_name: String,
        /// The variant.
        variant: String,
    },
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A constant.
    Literal(Literal),
    /// A local variable.
    Variable(String),
    /// A parameter.
    Parameter(String),
    /// `left op right`
    Binary {
        /// Operator.
        operator: BinaryOperator,
        /// Left operand.
        left: Box<Expression>,
        /// Right operand.
        right: Box<Expression>,
    },
    /// `op operand`
    Unary {
        /// Operator.
        operator: UnaryOperator,
        /// Operand.
        operand: Box<Expression>,
    },
    /// `array[index]`
    Index {
        /// The array.
        array: Box<Expression>,
        /// Element index.
        index: Box<Expression>,
    },
    /// `target.field`
    Field {
        /// The record.
        target: Box<Expression>,
        /// Field name.
        field: String,
    },
    /// A call whose value is used.
    Call {
        /// Callee full name or alias.
        member: String,
        /// Arguments in parameter order.
        #[serde(default)]
        arguments: Vec<Expression>,
    },
}

impl Expression {
    /// A local variable reference.
    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    /// A parameter reference.
    pub fn parameter(name: impl Into<String>) -> Self {
        Expression::Parameter(name.into())
    }

    /// A 32-bit unsigned constant.
    pub fn uint32(value: u32) -> Self {
        Expression::Literal(Literal::Int {
            value: i64::from(value),
            width: 32,
            signed: false,
        })
    }

    /// A boolean constant.
    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Bool(value))
    }

    /// `left op right`
    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `op operand`
    pub fn unary(operator: UnaryOperator, operand: Expression) -> Self {
        Expression::Unary {
            operator,
            operand: Box::new(operand),
        }
    }

    /// The variable or parameter an assignment to this expression writes,
    /// looking through element and field accesses.
    pub fn root_name(&self) -> Option<&str> {
        match self {
            Expression::Variable(name) | Expression::Parameter(name) => Some(name),
            Expression::Index { array, .. } => array.root_name(),
            Expression::Field { target, .. } => target.root_name(),
            _ => None,
        }
    }

    /// Calls `visit` on this expression and every nested one, pre-order.
    pub fn for_each<'a>(&'a self, visit: &mut impl FnMut(&'a Expression)) {
        visit(self);
        match self {
            Expression::Binary { left, right, .. } => {
                left.for_each(visit);
                right.for_each(visit);
            }
            Expression::Unary { operand, .. } => operand.for_each(visit),
            Expression::Index { array, index } => {
                array.for_each(visit);
                index.for_each(visit);
            }
            Expression::Field { target, .. } => target.for_each(visit),
            Expression::Call { arguments, .. } => {
                for argument in arguments {
                    argument.for_each(visit);
                }
            }
            Expression::Literal(_) | Expression::Variable(_) | Expression::Parameter(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looping_member() -> Member {
        let mut member = Member::new("Samples.Loop::Run()");
        member.locals.push(VariableDeclaration::new("i", TypeRef::uint32()));
        member.body = vec![Statement::While {
            condition: Expression::binary(
                BinaryOperator::LessThan,
                Expression::variable("i"),
                Expression::uint32(10),
            ),
            body: vec![
                Statement::assign(
                    Expression::variable("i"),
                    Expression::binary(
                        BinaryOperator::Add,
                        Expression::variable("i"),
                        Expression::uint32(1),
                    ),
                ),
                Statement::call("Samples.Loop::Step()"),
            ],
        }];
        member
    }

    #[test]
    fn statements_are_visited_recursively() {
        let member = looping_member();
        let mut calls = Vec::new();
        let mut count = 0;
        member.for_each_statement(&mut |statement| {
            count += 1;
            if let Statement::Call { member, .. } = statement {
                calls.push(member.as_str());
            }
        });
        assert_eq!(count, 3);
        assert_eq!(calls, vec!["Samples.Loop::Step()"]);
    }

    #[test]
    fn root_name_looks_through_accesses() {
        let target = Expression::Field {
            target: Box::new(Expression::Index {
                array: Box::new(Expression::variable("points")),
                index: Box::new(Expression::uint32(0)),
            }),
            field: "x".to_string(),
        };
        assert_eq!(target.root_name(), Some("points"));
        assert_eq!(Expression::uint32(3).root_name(), None);
    }

    #[test]
    fn member_lookup_accepts_aliases() {
        let mut member = Member::new("Samples.Calc::Run()");
        member.aliases.push("Samples.Calc::RunAsync()".to_string());
        let tree = SyntaxTree {
            types: Vec::new(),
            members: vec![member],
        };
        assert!(tree.member("Samples.Calc::RunAsync()").is_some());
        assert!(tree.member("Samples.Calc::Other()").is_none());
    }

    #[test]
    fn json_input_uses_defaults() {
        let json = r#"{
            "members": [
                {
                    "full_name": "Samples.Calc::Run()",
                    "is_interface": true,
                    "body": [ { "Return": {} } ]
                }
            ]
        }"#;
        let tree: SyntaxTree = serde_json::from_str(json).unwrap();
        let member = &tree.members[0];
        assert!(member.is_interface);
        assert!(member.parameters.is_empty());
        assert_eq!(member.body, vec![Statement::Return { value: None }]);
        assert_eq!(tree.interface_members().count(), 1);
    }
}
