pub mod host_guard;
pub mod request_id;
pub mod secret_policy;
pub mod security_headers;
