//! Names of the generated signals, variables and processes.
//!
//! Every name derives from member full names, so it is stable across runs.
//! Names are stored unescaped; rendering turns them into extended
//! identifiers.

/// Clock input port.
pub const CLOCK: &str = "Clock";
/// Synchronous reset input port, active high.
pub const RESET: &str = "Reset";
/// Host start request input port.
pub const STARTED: &str = "Started";
/// Completion output port.
pub const FINISHED: &str = "Finished";
/// ID of the entry point the host starts.
pub const MEMBER_ID: &str = "MemberId";

/// SimpleMemory data read from the host.
pub const DATA_IN: &str = "DataIn";
/// SimpleMemory data written to the host.
pub const DATA_OUT: &str = "DataOut";
/// SimpleMemory cell address.
pub const CELL_INDEX: &str = "CellIndex";
/// SimpleMemory read request.
pub const READ_ENABLE: &str = "ReadEnable";
/// SimpleMemory write request.
pub const WRITE_ENABLE: &str = "WriteEnable";
/// SimpleMemory read acknowledgement.
pub const READS_DONE: &str = "ReadsDone";
/// SimpleMemory write acknowledgement.
pub const WRITES_DONE: &str = "WritesDone";

/// Name of instance `instance` of `member`'s state machine.
pub fn component_name(member: &str, instance: u32) -> String {
    format!("{member}.{instance}")
}

/// The handshake start signal of a component.
pub fn started(component: &str) -> String {
    format!("{component}._Started")
}

/// The handshake completion signal of a component.
pub fn finished(component: &str) -> String {
    format!("{component}._Finished")
}

/// Signal carrying a parameter into a component.
pub fn parameter_in(component: &str, parameter: &str) -> String {
    format!("{component}.Parameter.{parameter}.In")
}

/// Signal carrying a component's return value out.
pub fn return_value(component: &str) -> String {
    format!("{component}.Return")
}

/// A variable owned by a component.
pub fn variable(component: &str, name: &str) -> String {
    format!("{component}.{name}")
}

/// The call slot `slot` a component uses to invoke `callee`.
///
/// A slot has its own `_Started`, `_Finished`, parameter and return
/// signals, named like a component's.
pub fn call_slot(component: &str, callee: &str, slot: u32) -> String {
    format!("{component}.{callee}.{slot}")
}

/// Signal carrying a parameter from a call slot to the proxy.
pub fn parameter_out(slot: &str, parameter: &str) -> String {
    format!("{slot}.Parameter.{parameter}.Out")
}

/// A component's own copy of a SimpleMemory output.
pub fn memory_signal(component: &str, port: &str) -> String {
    format!("{component}.{port}")
}

/// The state enum type of a component.
pub fn state_type(component: &str) -> String {
    format!("{component}._States")
}

/// Enum literal of state `index`.
pub fn state(component: &str, index: usize) -> String {
    format!("{component}._State_{index}")
}

/// The state-selector variable of a component.
pub fn state_variable(component: &str) -> String {
    format!("{component}._State")
}

/// The clocked process of a component.
pub fn state_machine_process(component: &str) -> String {
    format!("{component}._StateMachine")
}

/// The proxy process driving instance `instance` of `callee`.
pub fn internal_proxy_process(callee: &str, instance: u32) -> String {
    format!("InternalInvocationProxy.{}", component_name(callee, instance))
}

/// The process dispatching host calls.
pub const EXTERNAL_PROXY_PROCESS: &str = "ExternalInvocationProxy";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_names_nest_component_names() {
        let caller = component_name("Samples.Calc::Run()", 0);
        let slot = call_slot(&caller, "Samples.Calc::Add(u32)", 2);
        assert_eq!(slot, "Samples.Calc::Run().0.Samples.Calc::Add(u32).2");
        assert_eq!(started(&slot), format!("{slot}._Started"));
        assert_eq!(parameter_out(&slot, "x"), format!("{slot}.Parameter.x.Out"));
    }

    #[test]
    fn state_names_are_indexed() {
        assert_eq!(state("M.0", 3), "M.0._State_3");
        assert_ne!(state_type("M.0"), state_variable("M.0"));
    }
}
