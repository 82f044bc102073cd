// 缓存模块
// 队伍详情缓存和令牌吊销记录

pub mod keys;
mod team;
mod token;

pub use team::TeamCache;
pub use token::TokenRevocations;
