//! Method-name dispatch enums.
//!
//! [`ClientRequest`] covers every request a server can receive,
//! [`ClientNotification`] the notifications a server can receive, and
//! [`ServerNotification`] the notifications a client can receive. Each
//! `TryFrom` parses the raw JSON-RPC envelope into typed params, reporting
//! an unknown method or malformed params as a [`ConversionError`].

use serde::de::DeserializeOwned;

use crate::JSONRPCNotification;
use crate::JSONRPCRequest;
use crate::ModelContextProtocolNotification;
use crate::ModelContextProtocolRequest;
use crate::protocol::*;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
    #[error("invalid params for `{method}`: {source}")]
    InvalidParams {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn parse_params<P: DeserializeOwned>(
    method: &'static str,
    params: Option<serde_json::Value>,
) -> std::result::Result<P, ConversionError> {
    serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|source| ConversionError::InvalidParams { method, source })
}

/// A request from client to server, dispatched on its method name.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    InitializeRequest(InitializeRequestParams),
    PingRequest(Option<serde_json::Value>),
    ListToolsRequest(Option<ListToolsRequestParams>),
    CallToolRequest(CallToolRequestParams),
    ListPromptsRequest(Option<ListPromptsRequestParams>),
    GetPromptRequest(GetPromptRequestParams),
    ListResourcesRequest(Option<ListResourcesRequestParams>),
    ReadResourceRequest(ReadResourceRequestParams),
    SubscribeRequest(SubscribeRequestParams),
    UnsubscribeRequest(UnsubscribeRequestParams),
    SetLevelRequest(SetLevelRequestParams),
}

impl TryFrom<JSONRPCRequest> for ClientRequest {
    type Error = ConversionError;

    fn try_from(req: JSONRPCRequest) -> std::result::Result<Self, Self::Error> {
        let JSONRPCRequest { method, params, .. } = req;
        match method.as_str() {
            InitializeRequest::METHOD => Ok(ClientRequest::InitializeRequest(parse_params(
                InitializeRequest::METHOD,
                params,
            )?)),
            PingRequest::METHOD => Ok(ClientRequest::PingRequest(params)),
            ListToolsRequest::METHOD => Ok(ClientRequest::ListToolsRequest(parse_params(
                ListToolsRequest::METHOD,
                params,
            )?)),
            CallToolRequest::METHOD => Ok(ClientRequest::CallToolRequest(parse_params(
                CallToolRequest::METHOD,
                params,
            )?)),
            ListPromptsRequest::METHOD => Ok(ClientRequest::ListPromptsRequest(parse_params(
                ListPromptsRequest::METHOD,
                params,
            )?)),
            GetPromptRequest::METHOD => Ok(ClientRequest::GetPromptRequest(parse_params(
                GetPromptRequest::METHOD,
                params,
            )?)),
            ListResourcesRequest::METHOD => Ok(ClientRequest::ListResourcesRequest(parse_params(
                ListResourcesRequest::METHOD,
                params,
            )?)),
            ReadResourceRequest::METHOD => Ok(ClientRequest::ReadResourceRequest(parse_params(
                ReadResourceRequest::METHOD,
                params,
            )?)),
            SubscribeRequest::METHOD => Ok(ClientRequest::SubscribeRequest(parse_params(
                SubscribeRequest::METHOD,
                params,
            )?)),
            UnsubscribeRequest::METHOD => Ok(ClientRequest::UnsubscribeRequest(parse_params(
                UnsubscribeRequest::METHOD,
                params,
            )?)),
            SetLevelRequest::METHOD => Ok(ClientRequest::SetLevelRequest(parse_params(
                SetLevelRequest::METHOD,
                params,
            )?)),
            _ => Err(ConversionError::UnknownMethod(method)),
        }
    }
}

/// A notification from client to server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientNotification {
    InitializedNotification(Option<serde_json::Value>),
    CancelledNotification(CancelledNotificationParams),
}

impl TryFrom<JSONRPCNotification> for ClientNotification {
    type Error = ConversionError;

    fn try_from(n: JSONRPCNotification) -> std::result::Result<Self, Self::Error> {
        let JSONRPCNotification { method, params, .. } = n;
        match method.as_str() {
            InitializedNotification::METHOD => {
                Ok(ClientNotification::InitializedNotification(params))
            }
            CancelledNotification::METHOD => Ok(ClientNotification::CancelledNotification(
                parse_params(CancelledNotification::METHOD, params)?,
            )),
            _ => Err(ConversionError::UnknownMethod(method)),
        }
    }
}

/// A notification from server to client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerNotification {
    CancelledNotification(CancelledNotificationParams),
    ToolListChangedNotification(Option<serde_json::Value>),
    PromptListChangedNotification(Option<serde_json::Value>),
    ResourceListChangedNotification(Option<serde_json::Value>),
    ResourceUpdatedNotification(ResourceUpdatedNotificationParams),
    LoggingMessageNotification(LoggingMessageNotificationParams),
}

impl TryFrom<JSONRPCNotification> for ServerNotification {
    type Error = ConversionError;

    fn try_from(n: JSONRPCNotification) -> std::result::Result<Self, Self::Error> {
        let JSONRPCNotification { method, params, .. } = n;
        match method.as_str() {
            CancelledNotification::METHOD => Ok(ServerNotification::CancelledNotification(
                parse_params(CancelledNotification::METHOD, params)?,
            )),
            ToolListChangedNotification::METHOD => {
                Ok(ServerNotification::ToolListChangedNotification(params))
            }
            PromptListChangedNotification::METHOD => {
                Ok(ServerNotification::PromptListChangedNotification(params))
            }
            ResourceListChangedNotification::METHOD => {
                Ok(ServerNotification::ResourceListChangedNotification(params))
            }
            ResourceUpdatedNotification::METHOD => {
                Ok(ServerNotification::ResourceUpdatedNotification(parse_params(
                    ResourceUpdatedNotification::METHOD,
                    params,
                )?))
            }
            LoggingMessageNotification::METHOD => {
                Ok(ServerNotification::LoggingMessageNotification(parse_params(
                    LoggingMessageNotification::METHOD,
                    params,
                )?))
            }
            _ => Err(ConversionError::UnknownMethod(method)),
        }
    }
}
