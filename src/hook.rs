use crate::context::Context;
use crate::errors::{BindError, Result};
use crate::target::Target;
use crate::value::Value;

/// Binds `value` into `target`, letting a custom hook take over when the
/// target exposes one. Every field and container element goes through here.
pub fn bind_slot(target: &mut dyn Target, value: &Value, cx: &mut Context) -> Result<()> {
    let name = target.target_name();
    if let Some(hook) = target.as_hook() {
        tracing::trace!(ty = name, source = value.kind_name(), "delegating to hook");
        return hook
            .unmarshal_value(value)
            .map_err(|source| BindError::Hook { target: name, source });
    }
    target.coerce_from(value, cx)
}
