//! Echo tool

use crate::{ParamType, ParameterSchema, ToolSpec};

pub(crate) fn tool() -> ToolSpec {
    ToolSpec::from_fn(
        "echo",
        "Return the given text unchanged",
        ParameterSchema::new().required("text", ParamType::String, "Text to echo"),
        |args| async move { Ok(args.str("text")?.to_string()) },
    )
}
