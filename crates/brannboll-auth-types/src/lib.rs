//! Session types shared between the auth service and anything that needs to
//! read the member session: the session cookie builders, JWT claim layout and
//! token validation, and the member role enum.

pub mod cookie;
pub mod role;
pub mod token;
