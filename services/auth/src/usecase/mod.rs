pub mod logout;
pub mod request_code;
pub mod session;
pub mod verify_code;
