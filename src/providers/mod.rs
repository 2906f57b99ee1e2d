pub mod amap;
pub mod http;
pub mod ip_echo;

pub use amap::AmapClient;
pub use ip_echo::IpEchoClient;
