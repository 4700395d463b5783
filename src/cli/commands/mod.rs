pub mod init;
pub mod synth;
