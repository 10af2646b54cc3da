use std::fmt::Display;

use serde::Deserialize;

/// Method of the notification sent when the browser received an HTTP response
pub const RESPONSE_RECEIVED: &str = "Network.responseReceived";
/// Method of the notification sent when a frame navigated to a new document
pub const FRAME_NAVIGATED: &str = "Page.frameNavigated";

/// One raw entry of the browser performance log.
///
/// The entry is kept as the browser wrote it: its `message` is itself a JSON
/// document that is only decoded when someone asks for it with [`NetworkEvent::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkEvent {
    pub message: String,
}

/// The decoded notifications this tool cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ResponseReceived { url: String },
    FrameNavigated { url: String, top_level: bool },
    Other { method: String },
}

/// Why a record could not be decoded into a [`Notification`]
#[derive(Debug)]
pub enum Malformed {
    Json(serde_json::Error),
    MissingUrl { method: &'static str },
}

impl Display for Malformed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Malformed::Json(err) => write!(f, "invalid JSON: {err}"),
            Malformed::MissingUrl { method } => write!(f, "{method} without URL"),
        }
    }
}

impl From<serde_json::Error> for Malformed {
    fn from(err: serde_json::Error) -> Self {
        Malformed::Json(err)
    }
}

#[derive(Deserialize)]
struct Envelope {
    message: RawNotification,
}

#[derive(Deserialize)]
struct RawNotification {
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct ResponseParams {
    response: Response,
}

#[derive(Deserialize)]
struct Response {
    url: Option<String>,
}

#[derive(Deserialize)]
struct FrameParams {
    frame: Frame,
}

#[derive(Deserialize)]
struct Frame {
    url: Option<String>,
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
}

impl NetworkEvent {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Decode the record.
    ///
    /// Notifications with an unknown method are not malformed, they are returned
    /// as [`Notification::Other`].
    pub fn parse(&self) -> Result<Notification, Malformed> {
        let Envelope {
            message: RawNotification { method, params },
        } = serde_json::from_str(&self.message)?;

        match method.as_str() {
            RESPONSE_RECEIVED => {
                let params: ResponseParams = serde_json::from_value(params)?;
                let url = params.response.url.ok_or(Malformed::MissingUrl {
                    method: RESPONSE_RECEIVED,
                })?;
                Ok(Notification::ResponseReceived { url })
            }
            FRAME_NAVIGATED => {
                let params: FrameParams = serde_json::from_value(params)?;
                let url = params.frame.url.ok_or(Malformed::MissingUrl {
                    method: FRAME_NAVIGATED,
                })?;
                Ok(Notification::FrameNavigated {
                    url,
                    top_level: params.frame.parent_id.is_none(),
                })
            }
            _ => Ok(Notification::Other { method }),
        }
    }
}
