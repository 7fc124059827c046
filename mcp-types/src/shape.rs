//! Per-revision payload shaping.
//!
//! Every place where the three protocol revisions differ on the wire is
//! funneled through the adapter table below; the rest of the engine is
//! revision-agnostic. Shaping is pure: given the same in-memory payload and
//! revision, the wire form is deterministic, and decoding what was encoded
//! yields the payload restricted to the fields that revision defines.

use serde_json::Value;
use serde_json::json;

use crate::CallToolResult;
use crate::ClientCapabilities;
use crate::ClientCapabilitiesRoots;
use crate::ContentBlock;
use crate::Implementation;
use crate::InitializeResult;
use crate::ProtocolVersion;
use crate::ServerCapabilities;
use crate::ServerCapabilitiesPrompts;
use crate::ServerCapabilitiesResources;
use crate::ServerCapabilitiesTools;

/// Wire behavior of one protocol revision.
#[derive(Debug, Clone, Copy)]
pub struct VersionAdapter {
    pub version: ProtocolVersion,
    /// 2025-06-18 nests per-capability option objects; earlier revisions
    /// advertise bare presence flags.
    pub nested_capabilities: bool,
    /// Audio content blocks exist from 2025-03-26.
    pub audio_content: bool,
    /// `title` on client/server info exists from 2025-06-18.
    pub implementation_title: bool,
    /// `structuredContent` on tool results exists from 2025-06-18.
    pub structured_tool_content: bool,
    /// The `MCP-Protocol-Version` HTTP header is mandatory from 2025-06-18.
    pub protocol_version_header: bool,
}

const ADAPTERS: [VersionAdapter; 3] = [
    VersionAdapter {
        version: ProtocolVersion::V2024_11_05,
        nested_capabilities: false,
        audio_content: false,
        implementation_title: false,
        structured_tool_content: false,
        protocol_version_header: false,
    },
    VersionAdapter {
        version: ProtocolVersion::V2025_03_26,
        nested_capabilities: false,
        audio_content: true,
        implementation_title: false,
        structured_tool_content: false,
        protocol_version_header: false,
    },
    VersionAdapter {
        version: ProtocolVersion::V2025_06_18,
        nested_capabilities: true,
        audio_content: true,
        implementation_title: true,
        structured_tool_content: true,
        protocol_version_header: true,
    },
];

pub fn adapter(version: ProtocolVersion) -> &'static VersionAdapter {
    match version {
        ProtocolVersion::V2024_11_05 => &ADAPTERS[0],
        ProtocolVersion::V2025_03_26 => &ADAPTERS[1],
        ProtocolVersion::V2025_06_18 => &ADAPTERS[2],
    }
}

fn flag(present: bool) -> Option<Value> {
    present.then(|| json!(true))
}

/// Server capability map in the wire shape of `version`.
pub fn encode_server_capabilities(caps: &ServerCapabilities, version: ProtocolVersion) -> Value {
    if adapter(version).nested_capabilities {
        // Serialization of the typed struct cannot fail.
        return serde_json::to_value(caps).unwrap_or_else(|_| json!({}));
    }
    let mut map = serde_json::Map::new();
    for (name, present) in [
        ("completions", flag(caps.completions.is_some())),
        ("experimental", flag(caps.experimental.is_some())),
        ("logging", flag(caps.logging.is_some())),
        ("prompts", flag(caps.prompts.is_some())),
        ("resources", flag(caps.resources.is_some())),
        ("tools", flag(caps.tools.is_some())),
    ] {
        if let Some(v) = present {
            map.insert(name.to_string(), v);
        }
    }
    Value::Object(map)
}

/// Inverse of [`encode_server_capabilities`]. The flat shape carries no
/// option fields, so decoding it yields empty option structs.
pub fn decode_server_capabilities(
    value: &Value,
    version: ProtocolVersion,
) -> Result<ServerCapabilities, serde_json::Error> {
    if value.is_null() {
        return Ok(ServerCapabilities::default());
    }
    if adapter(version).nested_capabilities {
        return serde_json::from_value(value.clone());
    }
    let has = |name: &str| {
        value
            .get(name)
            .is_some_and(|v| !matches!(v, Value::Bool(false) | Value::Null))
    };
    Ok(ServerCapabilities {
        completions: has("completions").then(|| json!({})),
        experimental: has("experimental").then(|| json!({})),
        logging: has("logging").then(|| json!({})),
        prompts: has("prompts").then(ServerCapabilitiesPrompts::default),
        resources: has("resources").then(ServerCapabilitiesResources::default),
        tools: has("tools").then(ServerCapabilitiesTools::default),
    })
}

/// Client capability map in the wire shape of `version`.
pub fn encode_client_capabilities(caps: &ClientCapabilities, version: ProtocolVersion) -> Value {
    if adapter(version).nested_capabilities {
        return serde_json::to_value(caps).unwrap_or_else(|_| json!({}));
    }
    let mut map = serde_json::Map::new();
    for (name, present) in [
        ("experimental", flag(caps.experimental.is_some())),
        ("roots", flag(caps.roots.is_some())),
        ("sampling", flag(caps.sampling.is_some())),
    ] {
        if let Some(v) = present {
            map.insert(name.to_string(), v);
        }
    }
    Value::Object(map)
}

pub fn decode_client_capabilities(
    value: &Value,
    version: ProtocolVersion,
) -> Result<ClientCapabilities, serde_json::Error> {
    if value.is_null() {
        return Ok(ClientCapabilities::default());
    }
    if adapter(version).nested_capabilities {
        return serde_json::from_value(value.clone());
    }
    let has = |name: &str| {
        value
            .get(name)
            .is_some_and(|v| !matches!(v, Value::Bool(false) | Value::Null))
    };
    Ok(ClientCapabilities {
        experimental: has("experimental").then(|| json!({})),
        roots: has("roots").then(ClientCapabilitiesRoots::default),
        sampling: has("sampling").then(|| json!({})),
    })
}

/// Drops `title` for revisions that predate it.
pub fn shape_implementation(info: &Implementation, version: ProtocolVersion) -> Implementation {
    let mut info = info.clone();
    if !adapter(version).implementation_title {
        info.title = None;
    }
    info
}

/// Removes content parts the revision does not define.
pub fn shape_content_blocks(
    content: Vec<ContentBlock>,
    version: ProtocolVersion,
) -> Vec<ContentBlock> {
    if adapter(version).audio_content {
        return content;
    }
    content
        .into_iter()
        .filter(|block| !matches!(block, ContentBlock::AudioContent(_)))
        .collect()
}

/// Tool result in the shape of `version`: structured content and audio parts
/// are stripped where the revision does not define them.
pub fn shape_tool_result(result: CallToolResult, version: ProtocolVersion) -> CallToolResult {
    let a = adapter(version);
    CallToolResult {
        content: shape_content_blocks(result.content, version),
        is_error: result.is_error,
        structured_content: if a.structured_tool_content {
            result.structured_content
        } else {
            None
        },
    }
}

/// Full `initialize` result in the wire shape of `version`.
pub fn encode_initialize_result(result: &InitializeResult, version: ProtocolVersion) -> Value {
    let mut out = serde_json::Map::new();
    out.insert(
        "capabilities".to_string(),
        encode_server_capabilities(&result.capabilities, version),
    );
    if let Some(instructions) = &result.instructions {
        out.insert("instructions".to_string(), json!(instructions));
    }
    out.insert("protocolVersion".to_string(), json!(version.as_str()));
    let info = shape_implementation(&result.server_info, version);
    out.insert(
        "serverInfo".to_string(),
        serde_json::to_value(info).unwrap_or_else(|_| json!({})),
    );
    Value::Object(out)
}

/// Inverse of [`encode_initialize_result`], used by the client once the
/// server's version pick is known.
pub fn decode_initialize_result(
    value: &Value,
    version: ProtocolVersion,
) -> Result<InitializeResult, serde_json::Error> {
    let capabilities = decode_server_capabilities(
        value.get("capabilities").unwrap_or(&Value::Null),
        version,
    )?;
    let instructions = value
        .get("instructions")
        .and_then(Value::as_str)
        .map(str::to_string);
    let protocol_version = value
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(version.as_str())
        .to_string();
    let server_info: Implementation =
        serde_json::from_value(value.get("serverInfo").cloned().unwrap_or(Value::Null))?;
    Ok(InitializeResult {
        capabilities,
        instructions,
        protocol_version,
        server_info: shape_implementation(&server_info, version),
    })
}
