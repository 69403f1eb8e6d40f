//! iWrap command builders and reply parsers.
//!
//! All functions are pure: they build the text of one outgoing line, or pick
//! fields out of a line the module sent. The caller writes and reads lines
//! through the protocol client.
//!
//! # iWrap command reference
//!
//! Based on the iWRAP 6 user guide and the HFP/HSP application note. Replies
//! are positional, space-separated records; field positions below are
//! zero-based token indexes.

use bttrx_core::{DeviceAddress, Error, Result};
use bttrx_line_io::protocol::tokenize;

// ---------------------------------------------------------------
// Constants
// ---------------------------------------------------------------

/// Position of the Bluetooth address in a `LIST` result record.
pub const LIST_ADDRESS_FIELD: usize = 10;

/// Bluetooth class of device: audio/video hands-free gateway.
pub const DEVICE_CLASS_HFP_AG: &str = "400204";

/// SSP mode: display with yes/no confirmation, MITM protection optional.
pub const SSP_MODE: &str = "1 0";

/// Inbound connection filter: audio service class, audio/video major class.
pub const INBOUND_FILTER: &str = "200400 200400";

/// Control flags: KLUDGE, REMOVE_PAIR, NO_AUTO_DATAMODE, HFP_ERROR_BYPASS,
/// MITM_DISCARD_L4_KEY.
pub const CONTROL_CONFIG: &str = "0001 0000 00A0 1100";

/// Echo mask that stops the module from echoing issued commands.
pub const CONTROL_ECHO: &str = "5";

/// HFP-AG service UUID used when placing a call to a hands-free device.
pub const HFP_AG_UUID: &str = "111e";

// ---------------------------------------------------------------
// Command builders
// ---------------------------------------------------------------

/// Availability probe (`AT`); the module answers `OK`.
pub fn cmd_available() -> String {
    "AT".to_string()
}

/// Software reset (`RESET`).
pub fn cmd_reset() -> String {
    "RESET".to_string()
}

/// Build a `SET <category>[ <option> <value>]` line.
///
/// `Some("")` counts as absent. Fails if `category` is empty or if exactly
/// one of `option`/`value` is given.
///
/// ```
/// use bttrx_iwrap::commands::cmd_set;
/// assert_eq!(cmd_set("BT", Some("NAME"), Some("bt-trx")).unwrap(), "SET BT NAME bt-trx");
/// assert_eq!(cmd_set("TEST", None, None).unwrap(), "SET TEST");
/// assert!(cmd_set("TEST", Some("123"), None).is_err());
/// ```
pub fn cmd_set(category: &str, option: Option<&str>, value: Option<&str>) -> Result<String> {
    if category.is_empty() {
        return Err(Error::InvalidParameter("SET category is empty".into()));
    }
    let option = option.filter(|s| !s.is_empty());
    let value = value.filter(|s| !s.is_empty());

    match (option, value) {
        (Some(option), Some(value)) => Ok(format!("SET {category} {option} {value}")),
        (None, None) => Ok(format!("SET {category}")),
        _ => Err(Error::InvalidParameter(format!(
            "SET {category}: option and value must be given together"
        ))),
    }
}

/// Configuration readback (bare `SET`).
pub fn cmd_read_configuration() -> String {
    "SET".to_string()
}

/// Query the module's own Bluetooth address.
pub fn cmd_read_bd_address() -> String {
    "SET BT BDADDR".to_string()
}

/// Start an inquiry lasting `duration` × 1.28 s, optionally resolving names.
pub fn cmd_inquiry(duration: u8, with_names: bool) -> String {
    if with_names {
        format!("INQUIRY {duration} NAME")
    } else {
        format!("INQUIRY {duration}")
    }
}

/// List active connections.
pub fn cmd_list() -> String {
    "LIST".to_string()
}

/// Open an HFP-AG link to `address`.
pub fn cmd_call_hfp_ag(address: &DeviceAddress) -> String {
    format!("call {address} {HFP_AG_UUID} hfp-ag")
}

/// Accept a Secure Simple Pairing request from `address`.
pub fn cmd_ssp_confirm(address: &DeviceAddress) -> String {
    format!("SSP CONFIRM {address} OK")
}

/// Report a mobile network indicator to the hands-free device.
pub fn cmd_status(option: &str, value: &str) -> String {
    format!("STATUS {option} {value}")
}

/// Indicate an outgoing call.
pub fn cmd_dialing() -> String {
    "DIALING".to_string()
}

/// Accept the pending call.
pub fn cmd_connect() -> String {
    "CONNECT".to_string()
}

/// Terminate the current call.
pub fn cmd_hangup() -> String {
    "HANGUP".to_string()
}

/// Forget every pairing.
pub fn cmd_reset_pairings() -> String {
    "SET BT PAIR *".to_string()
}

/// Fallback PIN for devices without SSP. Must be exactly 4 digits.
pub fn cmd_set_pin_code(pin: &str) -> Result<String> {
    if pin.len() != 4 || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidParameter(format!(
            "PIN must be exactly 4 digits, got {pin:?}"
        )));
    }
    cmd_set("BT", Some("AUTH *"), Some(pin))
}

/// Audio codec gains as decimal strings.
pub fn cmd_set_audio_gain(adc: &str, dac: &str) -> Result<String> {
    for (name, gain) in [("ADC", adc), ("DAC", dac)] {
        if gain.is_empty() || !gain.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidParameter(format!(
                "{name} gain must be a decimal number, got {gain:?}"
            )));
        }
    }
    cmd_set("CONTROL", Some("GAIN"), Some(&format!("{adc} {dac}")))
}

/// The fixed configuration pushed to the module after power-up.
///
/// `friendly_name` is advertised to phones; `pin` is the fallback PIN for
/// devices without SSP.
pub fn configuration_batch(friendly_name: &str, pin: &str) -> Vec<String> {
    [
        ("BT", "NAME", friendly_name),
        ("PROFILE", "HFP-AG", "ON"),
        ("BT", "CLASS", DEVICE_CLASS_HFP_AG),
        ("BT", "SSP", SSP_MODE),
        ("BT", "FILTER", INBOUND_FILTER),
        ("BT", "AUTH *", pin),
        ("CONTROL", "CONFIG", CONTROL_CONFIG),
        ("CONTROL", "ECHO", CONTROL_ECHO),
    ]
    .into_iter()
    .map(|(category, option, value)| format!("SET {category} {option} {value}"))
    .collect()
}

// ---------------------------------------------------------------
// Reply parsers
// ---------------------------------------------------------------

fn field<'a>(tokens: &[&'a str], index: usize, line: &str) -> Result<&'a str> {
    tokens
        .get(index)
        .copied()
        .ok_or_else(|| Error::Malformed(format!("missing field {index} in {line:?}")))
}

/// Count from an `INQUIRY <n>` or `LIST <n>` header.
pub fn parse_count(line: &str) -> Result<usize> {
    let tokens = tokenize(line);
    let count = field(&tokens, 1, line)?;
    count
        .parse()
        .map_err(|_| Error::Malformed(format!("bad count {count:?} in {line:?}")))
}

/// Address from an `INQUIRY <addr> <class> ...` record.
pub fn parse_inquiry_address(line: &str) -> Result<DeviceAddress> {
    let tokens = tokenize(line);
    field(&tokens, 1, line).map(DeviceAddress::from)
}

/// Address from a `LIST` result record (token 10 of a 15-field record).
pub fn parse_list_address(line: &str) -> Result<DeviceAddress> {
    let tokens = tokenize(line);
    field(&tokens, LIST_ADDRESS_FIELD, line).map(DeviceAddress::from)
}

/// Address from an `SSP CONFIRM <addr> <passkey>` request.
pub fn parse_ssp_address(line: &str) -> Result<DeviceAddress> {
    let tokens = tokenize(line);
    field(&tokens, 2, line).map(DeviceAddress::from)
}

/// Last `len` hex digits of the address in a `SET BT BDADDR <addr>` reply.
pub fn parse_address_suffix(line: &str, len: usize) -> Result<String> {
    let tokens = tokenize(line);
    let address = DeviceAddress::from(field(&tokens, 3, line)?);
    address
        .suffix(len)
        .ok_or_else(|| Error::Malformed(format!("not a hex address in {line:?}")))
}

/// Address and friendly name from `NAME <addr> "<name>"`.
///
/// The name may contain spaces; surrounding quotes are removed.
pub fn parse_name_result(line: &str) -> Result<(DeviceAddress, String)> {
    let rest = line
        .trim_start()
        .strip_prefix("NAME")
        .ok_or_else(|| Error::Malformed(format!("not a NAME result: {line:?}")))?
        .trim_start();
    let (address, name) = rest
        .split_once(' ')
        .ok_or_else(|| Error::Malformed(format!("NAME without a name: {line:?}")))?;
    if address == "ERROR" {
        return Err(Error::Malformed(format!("NAME lookup failed: {line:?}")));
    }
    let name = name.trim();
    let name = name
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name);
    Ok((DeviceAddress::from(address), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_with_option_and_value() {
        assert_eq!(
            cmd_set("PROFILE", Some("HFP-AG"), Some("ON")).unwrap(),
            "SET PROFILE HFP-AG ON"
        );
    }

    #[test]
    fn set_category_only() {
        assert_eq!(cmd_set("TEST", None, None).unwrap(), "SET TEST");
        assert_eq!(cmd_set("TEST", Some(""), Some("")).unwrap(), "SET TEST");
    }

    #[test]
    fn set_rejects_half_pairs() {
        assert!(matches!(
            cmd_set("TEST", Some(""), Some("456")),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            cmd_set("TEST", Some("123"), Some("")),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn set_rejects_empty_category() {
        assert!(cmd_set("", None, None).is_err());
    }

    #[test]
    fn inquiry_with_and_without_names() {
        assert_eq!(cmd_inquiry(5, false), "INQUIRY 5");
        assert_eq!(cmd_inquiry(5, true), "INQUIRY 5 NAME");
    }

    #[test]
    fn call_hfp_ag() {
        let addr = DeviceAddress::new("de:ad:be:ef:ca:fe");
        assert_eq!(cmd_call_hfp_ag(&addr), "call de:ad:be:ef:ca:fe 111e hfp-ag");
        assert_eq!(cmd_ssp_confirm(&addr), "SSP CONFIRM de:ad:be:ef:ca:fe OK");
    }

    #[test]
    fn pin_code_validation() {
        assert_eq!(cmd_set_pin_code("1234").unwrap(), "SET BT AUTH * 1234");
        assert!(cmd_set_pin_code("123").is_err());
        assert!(cmd_set_pin_code("12345").is_err());
        assert!(cmd_set_pin_code("12a4").is_err());
    }

    #[test]
    fn audio_gain_validation() {
        assert_eq!(cmd_set_audio_gain("8", "10").unwrap(), "SET CONTROL GAIN 8 10");
        assert!(cmd_set_audio_gain("", "8").is_err());
        assert!(cmd_set_audio_gain("8", "-1").is_err());
    }

    #[test]
    fn configuration_batch_contents() {
        let batch = configuration_batch("bt-trx-12abcd", "0000");
        assert_eq!(batch.len(), 8);
        assert_eq!(batch[0], "SET BT NAME bt-trx-12abcd");
        assert_eq!(batch[1], "SET PROFILE HFP-AG ON");
        assert_eq!(batch[2], "SET BT CLASS 400204");
        assert_eq!(batch[3], "SET BT SSP 1 0");
        assert_eq!(batch[4], "SET BT FILTER 200400 200400");
        assert_eq!(batch[5], "SET BT AUTH * 0000");
        assert_eq!(batch[6], "SET CONTROL CONFIG 0001 0000 00A0 1100");
        assert_eq!(batch[7], "SET CONTROL ECHO 5");
    }

    #[test]
    fn parse_counts() {
        assert_eq!(parse_count("INQUIRY 2").unwrap(), 2);
        assert_eq!(parse_count("LIST 0").unwrap(), 0);
        assert!(matches!(parse_count("LIST"), Err(Error::Malformed(_))));
        assert!(matches!(parse_count("LIST x"), Err(Error::Malformed(_))));
    }

    #[test]
    fn parse_list_record() {
        let line = "LIST 0 CONNECTED HFP-AG 667 0 0 7 8d 8d de:ad:be:ef:ca:fe 3 INCOMING ACTIVE SLAVE ENCRYPTED 0";
        assert_eq!(parse_list_address(line).unwrap().as_str(), "de:ad:be:ef:ca:fe");
        assert!(parse_list_address("LIST 0 CONNECTED HFP-AG").is_err());
    }

    #[test]
    fn parse_address_suffix_from_bdaddr() {
        assert_eq!(
            parse_address_suffix("SET BT BDADDR 00:07:80:12:ab:cd", 6).unwrap(),
            "12abcd"
        );
        assert!(parse_address_suffix("SET BT BDADDR", 6).is_err());
        assert!(matches!(
            parse_address_suffix("SET BT BDADDR éééaé", 6),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn parse_name() {
        let (addr, name) =
            parse_name_result("NAME 00:11:22:33:44:55 \"Car Kit 2000\"").unwrap();
        assert_eq!(addr.as_str(), "00:11:22:33:44:55");
        assert_eq!(name, "Car Kit 2000");
        assert!(parse_name_result("NAME ERROR 0x1003 00:11:22:33:44:55").is_err());
    }
}
