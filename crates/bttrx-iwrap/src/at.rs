//! Emulated cellular-modem AT command surface.
//!
//! Hands-free devices probe the "phone" with AT commands that the module
//! does not answer itself and forwards as `HFP-AG <id> UNKNOWN <n> <cmd>`.
//! [`emulate`] returns the canned answer for each command the bridge knows;
//! the answers describe a phone registered on its home network with full
//! signal and battery, a one-entry phonebook and no SMS support.

use bttrx_core::{Error, Result};
use bttrx_line_io::protocol::tokenize;

/// Operator-name line, sent both on `AT+COPS?` and unsolicited.
pub const COPS_REPLY: &str = "+COPS: 0,0,\"bt-trx\"";

/// Extract the AT command from an `HFP-AG <id> UNKNOWN <n> <cmd>` line.
///
/// The module prints the command's carriage return as the two characters
/// `\r`; that suffix is removed.
pub fn extract_command(raw: &str) -> Result<String> {
    let tokens = tokenize(raw);
    let cmd = tokens
        .get(4)
        .copied()
        .ok_or_else(|| Error::Malformed(format!("no AT command in {raw:?}")))?;
    Ok(cmd.strip_suffix("\\r").unwrap_or(cmd).to_string())
}

/// Lines to answer `cmd` with, or `None` for an unknown command.
///
/// An empty list means the command is recognized but needs no answer.
pub fn emulate(cmd: &str) -> Option<Vec<&'static str>> {
    let lines: &[&'static str] = match cmd {
        // echo/noise cancellation is not available
        "AT+NREC=0" => &["ERROR"],
        "AT+CGMR" | "AT+GMR" => &["+CGMR: \"1.0\"", "OK"],
        "AT+CGSN" | "AT+GSN" => &["+CGSN: 123456", "OK"],
        "AT+CGMI" | "AT+CGMI?" | "AT+GMI" | "AT+GMI?" => &["+CGMI: bt-trx", "OK"],
        "AT+CGMM" | "AT+CGMM?" | "AT+GMM" | "AT+GMM?" => &["+CGMM: bt-trx", "OK"],
        // registered, home network
        "AT+CREG?" => &["+CREG: 1,1", "OK"],
        "AT+CREG=?" => &["+CREG: 0", "OK"],
        "AT+CREG=0" | "AT+CREG=1" | "AT+CREG=2" => &["OK"],
        "AT+BTRH?" => &["+BTRH: 1", "OK"],
        "AT+CPBS=?" => &["+CPBS: \"ME\"", "OK"],
        // storage, used entries, max entries
        "AT+CPBS?" => &["+CPBS: \"ME\", 1, 100", "OK"],
        // index range, number length, name length
        "AT+CPBR=?" => &["+CPBR: (1-10),20,18", "OK"],
        "AT+CSCS?" | "AT+CSCS=?" => &["+CSCS: GSM", "OK"],
        "AT+CMGS=?" | "AT+CMSS=?" | "AT+CMGL=?" | "AT+CMGR=?" | "AT+CNMI=?" => &["ERROR"],
        "AT+CIMI" | "AT+CIMI?" | "AT+CIMI=?" => &["+CIMI: 262735573557355", "OK"],
        // RSSI, BER
        "AT+CSQ" | "AT+CSQ?" => &["+CSQ: 31,0", "OK"],
        "AT+CBC" | "AT+CBC=?" => &["+CBC: 0,100", "OK"],
        "ATI" | "ATI0" => &["bt-trx 1.0", "OK"],
        "AT+APLSIRI?" => &["+APLSIRI:0", "OK"],
        "AT+COPS?" => &[COPS_REPLY, "OK"],
        "ATE0" => &[],
        _ => return emulate_prefixed(cmd),
    };
    Some(lines.to_vec())
}

fn emulate_prefixed(cmd: &str) -> Option<Vec<&'static str>> {
    const ACKNOWLEDGED: [&str; 7] = [
        "AT+CMGF=",
        "AT+CNMI=",
        "AT+CSCS=\"",
        "AT+CSRSF=\"",
        "AT+CPMS=",
        "AT+CPBS=\"",
        "AT+COPS=",
    ];

    if cmd.starts_with("AT+CPBR=") {
        // index, number, unknown number format, name
        return Some(vec!["+CPBR: 1,\"737373\",129,\"bt-trx\"", "OK"]);
    }
    if cmd.starts_with("AT+XAPL=") {
        // accessory capability report; no answer expected
        return Some(Vec::new());
    }
    if ACKNOWLEDGED.iter().any(|prefix| cmd.starts_with(prefix)) {
        return Some(vec!["OK"]);
    }
    None
}
