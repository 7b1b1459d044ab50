pub mod args_helper;
pub mod init;
pub mod termination;
