//! End-to-end runs of the manifest builder.

use hast_config::{load_config_from_str, HardwareGenerationConfig, MemberInvocationInstanceCountConfiguration};
use hast_device::{builtin_manifest, BinaryOperator, TimingReport, TimingReportDeviceDriver};
use hast_transformer::tree::{Expression, Statement};
use hast_transformer::{
    ManifestBuilder, Member, SyntaxTree, TransformError, TypeRef, VariableDeclaration, VhdlHardwareDescription,
    VHDL_LANGUAGE,
};
use hast_vhdl::VhdlGenerationOptions;

fn driver() -> TimingReportDeviceDriver {
    TimingReportDeviceDriver::new(builtin_manifest("Nexys A7").unwrap(), TimingReport::default())
}

fn interface(name: &str) -> Member {
    let mut member = Member::new(name);
    member.is_interface = true;
    member
}

/// `Chain::A()` starts five concurrent `Chain::B()` which each call `Chain::C()`.
fn chain_tree() -> SyntaxTree {
    let mut a = interface("Chain::A()");
    a.body = vec![Statement::Parallel {
        member: "Chain::B()".to_string(),
        degree: 5,
        arguments: Vec::new(),
        results: Vec::new(),
        pass_index: false,
    }];
    let mut b = Member::new("Chain::B()");
    b.body = vec![Statement::call("Chain::C()")];
    let mut c = Member::new("Chain::C()");
    c.locals.push(VariableDeclaration::new("x", TypeRef::uint32()));
    c.body = vec![Statement::assign(
        Expression::variable("x"),
        Expression::binary(BinaryOperator::Add, Expression::variable("x"), Expression::uint32(1)),
    )];
    SyntaxTree {
        types: Vec::new(),
        members: vec![a, b, c],
    }
}

fn factorial_tree() -> SyntaxTree {
    let mut factorial = Member::new("Math::Factorial(u32)");
    factorial.parameters.push(VariableDeclaration::new("n", TypeRef::uint32()));
    factorial.locals.push(VariableDeclaration::new("rest", TypeRef::uint32()));
    factorial.return_type = Some(TypeRef::uint32());
    factorial.body = vec![
        Statement::If {
            condition: Expression::binary(BinaryOperator::LessThan, Expression::parameter("n"), Expression::uint32(2)),
            then_body: vec![Statement::Return {
                value: Some(Expression::uint32(1)),
            }],
            else_body: Vec::new(),
        },
        Statement::Call {
            member: "Math::Factorial(u32)".to_string(),
            arguments: vec![Expression::binary(
                BinaryOperator::Subtract,
                Expression::parameter("n"),
                Expression::uint32(1),
            )],
            result: Some(Expression::variable("rest")),
        },
        Statement::Return {
            value: Some(Expression::binary(
                BinaryOperator::Multiply,
                Expression::parameter("n"),
                Expression::variable("rest"),
            )),
        },
    ];
    let mut run = interface("Math::Run()");
    run.locals.push(VariableDeclaration::new("value", TypeRef::uint32()));
    run.body = vec![
        Statement::MemoryRead {
            cell_index: Expression::uint32(0),
            target: Expression::variable("value"),
        },
        Statement::Call {
            member: "Math::Factorial(u32)".to_string(),
            arguments: vec![Expression::variable("value")],
            result: Some(Expression::variable("value")),
        },
        Statement::MemoryWrite {
            cell_index: Expression::uint32(0),
            value: Expression::variable("value"),
        },
    ];
    SyntaxTree {
        types: Vec::new(),
        members: vec![factorial, run],
    }
}

#[test_log::test]
fn member_ids_follow_names_not_tree_order() {
    let config = HardwareGenerationConfig::new("Nexys A7");
    let driver = driver();
    let forward = SyntaxTree {
        types: Vec::new(),
        members: vec![interface("Z::Last()"), interface("A::First()"), interface("M::Middle()")],
    };
    let mut backward = forward.clone();
    backward.members.reverse();

    let first = ManifestBuilder::new(&config, &driver).build(&forward).unwrap();
    let second = ManifestBuilder::new(&config, &driver).build(&backward).unwrap();
    assert_eq!(first.member_id_table, second.member_id_table);
    assert_eq!(first.member_id_table.id_of("A::First()"), Some(0));
    assert_eq!(first.member_id_table.id_of("M::Middle()"), Some(1));
    assert_eq!(first.member_id_table.id_of("Z::Last()"), Some(2));

    let options = VhdlGenerationOptions::debug();
    assert_eq!(first.to_vhdl(&options), second.to_vhdl(&options));
}

#[test_log::test]
fn top_entity_exposes_the_host_handshake() {
    let config = HardwareGenerationConfig::new("Nexys A7");
    let driver = driver();
    let manifest = ManifestBuilder::new(&config, &driver).build(&chain_tree()).unwrap();
    let vhdl = manifest.to_vhdl(&VhdlGenerationOptions::debug());

    assert!(vhdl.starts_with("library ieee;\n"));
    assert!(vhdl.contains("entity Hast_IP is\n"));
    assert!(vhdl.contains("MemberId: in integer;"));
    assert!(vhdl.contains("Finished: out boolean;"));
    assert!(vhdl.contains("architecture Imp of Hast_IP is\n"));
    assert!(vhdl.contains("ExternalInvocationProxy: process (Clock) is"));
    assert!(vhdl.contains("\\Chain::A().0._Started\\ <= true;"));
    assert!(vhdl.contains("if (\\Chain::A().0._Finished\\) then"));
}

#[test_log::test]
fn parallelism_propagates_down_the_call_chain() {
    let config = HardwareGenerationConfig::new("Nexys A7");
    let driver = driver();
    let manifest = ManifestBuilder::new(&config, &driver).build(&chain_tree()).unwrap();
    let vhdl = manifest.to_vhdl(&VhdlGenerationOptions::debug());

    for member in ["Chain::B()", "Chain::C()"] {
        for instance in 0..5 {
            assert!(vhdl.contains(&format!("\\{member}.{instance}._StateMachine\\: process (Clock) is")));
        }
        assert!(!vhdl.contains(&format!("\\{member}.5._StateMachine\\")));
    }
    assert!(vhdl.contains("\\InternalInvocationProxy.Chain::C().4\\: process (Clock) is"));
    assert!(manifest.warnings.is_empty());
}

#[test_log::test]
fn configured_parallelism_raises_counts() {
    let mut config = HardwareGenerationConfig::new("Nexys A7");
    config.transformer.add_or_replace(
        MemberInvocationInstanceCountConfiguration::new("Chain::C").with_max_degree_of_parallelism(7),
    );
    let driver = driver();
    let manifest = ManifestBuilder::new(&config, &driver).build(&chain_tree()).unwrap();
    let vhdl = manifest.to_vhdl(&VhdlGenerationOptions::debug());
    assert!(vhdl.contains("\\Chain::C().6._StateMachine\\"));
    assert!(!vhdl.contains("\\Chain::B().5._StateMachine\\"));
}

#[test_log::test]
fn a_tree_without_interface_members_is_rejected() {
    let config = HardwareGenerationConfig::new("Nexys A7");
    let driver = driver();
    let tree = SyntaxTree {
        types: Vec::new(),
        members: vec![Member::new("Hidden::Run()")],
    };
    let result = ManifestBuilder::new(&config, &driver).build(&tree);
    assert!(matches!(result, Err(TransformError::NoInterfaceMembers)));
}

#[test_log::test]
fn recursion_deeper_than_configured_is_reported() {
    let mut config = HardwareGenerationConfig::new("Nexys A7");
    config.transformer.add_or_replace(
        MemberInvocationInstanceCountConfiguration::new("Math::Factorial").with_max_recursion_depth(3),
    );
    let driver = driver();
    let manifest = ManifestBuilder::new(&config, &driver).build(&factorial_tree()).unwrap();
    let vhdl = manifest.to_vhdl(&VhdlGenerationOptions::debug());

    assert!(vhdl.contains("\\Math::Factorial(u32).3._StateMachine\\"));
    assert!(!vhdl.contains("\\Math::Factorial(u32).4._StateMachine\\"));
    assert_eq!(manifest.warnings.len(), 1);
    assert!(vhdl.contains("ReadEnable <= \\Math::Run().0.ReadEnable\\;"));
}

#[test_log::test]
fn saved_descriptions_load_back_unchanged() {
    let config = load_config_from_str(
        r#"
device_name = "Nexys A7"
hardware_entry_point_members = ["Math::Run()"]

[[transformer.member_invocation_instance_counts]]
member_name_prefix = "Math::Factorial"
max_recursion_depth = 2
"#,
    )
    .unwrap();
    let driver = driver();
    let manifest = ManifestBuilder::new(&config, &driver).build(&factorial_tree()).unwrap();
    let description = VhdlHardwareDescription::new(&manifest, &config.vhdl);
    assert_eq!(description.language, VHDL_LANGUAGE);
    assert_eq!(description.hardware_entry_point_members, vec!["Math::Run()".to_string()]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hardware.json");
    description.save_to_file(&path).unwrap();
    let loaded = VhdlHardwareDescription::load_from_file(&path).unwrap();
    assert_eq!(loaded, description);
    assert_eq!(loaded.member_id_table.id_of("Math::Run()"), Some(0));
}

#[test_log::test]
fn formatting_options_do_not_change_the_design() {
    let config = HardwareGenerationConfig::new("Nexys A7");
    let driver = driver();
    let manifest = ManifestBuilder::new(&config, &driver).build(&factorial_tree()).unwrap();
    let packed = manifest.to_vhdl(&VhdlGenerationOptions {
        format_code: false,
        ..VhdlGenerationOptions::debug()
    });
    let formatted = manifest.to_vhdl(&VhdlGenerationOptions::debug());
    assert!(packed.len() < formatted.len());
    assert!(packed.contains("entity Hast_IP is"));
}
