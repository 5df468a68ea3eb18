mod env;
pub mod log;
mod serve;

pub use serve::{
    router, start_server, ApiError, AppConfig, AppState, AttemptResult, BodyStyle,
    OutboundPayload, ReqwestUpstream, UpstreamClient, UpstreamResponse,
};
