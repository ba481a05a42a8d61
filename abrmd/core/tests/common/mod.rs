//! Shared helpers for abrmd-core integration tests
//!
//! - [`TestOptions`]: which TCTI the hardware-facing tests should use, read
//!   from `TABRMD_TEST_*` environment variables
//! - [`FakeSimulator`]: a one-shot TPM2 simulator command port on localhost

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

pub const ENV_TCTI: &str = "TABRMD_TEST_TCTI";
pub const ENV_TCTI_CONF: &str = "TABRMD_TEST_TCTI_CONF";
pub const ENV_BUS_TYPE: &str = "TABRMD_TEST_BUS_TYPE";
pub const ENV_BUS_NAME: &str = "TABRMD_TEST_BUS_NAME";
pub const ENV_TCTI_RETRIES: &str = "TABRMD_TEST_TCTI_RETRIES";

// =============================================================================
// Test Options
// =============================================================================

/// Message bus the broker under test is reachable on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusType {
    System,
    Session,
}

impl BusType {
    /// Parse a bus type; anything but `system`/`session` aborts the test run
    pub fn from_name(name: &str) -> Self {
        match name {
            "system" => Self::System,
            "session" => Self::Session,
            other => panic!("Invalid bus type for {ENV_BUS_TYPE}: {other}"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Session => "session",
        }
    }
}

/// Harness options for tests that need a real TCTI
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestOptions {
    pub tcti_filename: Option<String>,
    pub tcti_conf: Option<String>,
    pub bus_type: BusType,
    pub bus_name: String,
    pub tcti_retries: u64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            tcti_filename: None,
            tcti_conf: None,
            bus_type: BusType::System,
            bus_name: "com.intel.tss2.Tabrmd".to_string(),
            tcti_retries: 0,
        }
    }
}

impl TestOptions {
    /// Read options from the process environment
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read options through `env`; unset variables keep their defaults
    pub fn from_env_with(env: impl Fn(&str) -> Option<String>) -> Self {
        let mut opts = Self::default();
        if let Some(tcti) = env(ENV_TCTI) {
            opts.tcti_filename = Some(tcti);
        }
        if let Some(conf) = env(ENV_TCTI_CONF) {
            opts.tcti_conf = Some(conf);
        }
        if let Some(bus_type) = env(ENV_BUS_TYPE) {
            opts.bus_type = BusType::from_name(&bus_type);
        }
        if let Some(bus_name) = env(ENV_BUS_NAME) {
            opts.bus_name = bus_name;
        }
        if let Some(retries) = env(ENV_TCTI_RETRIES) {
            opts.tcti_retries = leading_u64(&retries);
        }
        opts
    }

    /// Human-readable rendering of every option
    pub fn dump(&self) -> String {
        fn show(value: Option<&str>) -> &str {
            value.unwrap_or("(null)")
        }

        format!(
            "test options:\n  \
             tcti_filename:   {}\n  \
             tcti_conf:       {}\n  \
             tabrmd_bus_type: {}\n  \
             tabrmd_bus_name: {}\n  \
             retries:         {}\n",
            show(self.tcti_filename.as_deref()),
            show(self.tcti_conf.as_deref()),
            self.bus_type.name(),
            self.bus_name,
            self.tcti_retries,
        )
    }
}

/// Base-10 value of the leading digits like `strtoumax`: 0 if there are none,
/// saturating at `u64::MAX`
fn leading_u64(text: &str) -> u64 {
    let text = text.trim_start();
    let text = text.strip_prefix('+').unwrap_or(text);
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

// =============================================================================
// Fake Simulator
// =============================================================================

/// Accepts one connection, reads one framed command, answers with `response`
pub struct FakeSimulator {
    pub port: u16,
    handle: JoinHandle<Vec<u8>>,
}

impl FakeSimulator {
    pub fn start(response: Vec<u8>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();

            let mut header = [0u8; 9];
            stream.read_exact(&mut header).unwrap();
            assert_eq!(u32::from_be_bytes(header[0..4].try_into().unwrap()), 8);
            let len = u32::from_be_bytes(header[5..9].try_into().unwrap()) as usize;
            let mut command = vec![0u8; len];
            stream.read_exact(&mut command).unwrap();

            let mut reply = Vec::new();
            reply.extend_from_slice(&(response.len() as u32).to_be_bytes());
            reply.extend_from_slice(&response);
            reply.extend_from_slice(&0u32.to_be_bytes());
            stream.write_all(&reply).unwrap();
            command
        });

        Self { port, handle }
    }

    /// The command the simulator received
    pub fn finish(self) -> Vec<u8> {
        self.handle.join().unwrap()
    }
}

/// `TPM2_Startup(SU_CLEAR)`
pub const STARTUP_CLEAR: [u8; 12] = [
    0x80, 0x01, 0x00, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x01, 0x44, 0x00, 0x00,
];

/// A `TPM_RC_SUCCESS` response header
pub const SUCCESS_RESPONSE: [u8; 10] = [0x80, 0x01, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x00];
