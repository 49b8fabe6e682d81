//! Building blocks for [`clap`]-driven configuration of ONAP clients
pub mod aai;
