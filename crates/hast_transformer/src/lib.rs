//! Transformation of a cleaned syntax tree into VHDL.
//!
//! Every member reachable from a hardware entry point becomes one or more
//! clock-driven state machines. Members call each other through invocation
//! proxies built from a handshake of `_Started`/`_Finished` signals; the
//! host starts entry points through the external invocation proxy by
//! numeric member ID. [`ManifestBuilder`] runs the whole pipeline and
//! [`VhdlHardwareDescription`] persists its result.

#![warn(missing_docs)]

pub mod architecture_component;
pub mod call_graph;
pub mod error;
pub mod external_proxy;
pub mod hardware_description;
pub mod internal_proxy;
pub mod manifest_builder;
pub mod member_id_table;
pub mod member_transformer;
pub mod memory_proxy;
pub mod naming;
pub mod state_machine;
pub mod tree;
pub mod type_mapping;
pub mod verification;

pub use architecture_component::{ArchitectureComponent, ArchitectureComponentResult};
pub use call_graph::{CallGraph, InstanceCounts};
pub use error::TransformError;
pub use external_proxy::build_external_invocation_proxy;
pub use hardware_description::{HardwareDescriptionError, VhdlHardwareDescription, VHDL_LANGUAGE};
pub use internal_proxy::{allocate_call_slots, build_internal_invocation_proxies, CallSlot, InternalInvocationProxies};
pub use manifest_builder::{ManifestBuilder, TransformedVhdlManifest, TOP_ENTITY_NAME};
pub use member_id_table::MemberIdTable;
pub use member_transformer::{
    MemberTransformer, MemberTransformerContext, StateMachineMemberTransformer, TransformedMember,
};
pub use memory_proxy::build_memory_proxy;
pub use state_machine::{MemberState, MemberStateMachine};
pub use tree::{Member, SyntaxTree, TypeDefinition, TypeRef, VariableDeclaration};
pub use type_mapping::TypeMapper;
pub use verification::verify;
