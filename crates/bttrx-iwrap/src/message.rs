//! Classification of lines sent by the module.
//!
//! [`classify`] looks at the first token of a line and sorts it into a
//! [`MessageKind`]. Lines that belong to a known family but have the wrong
//! shape fail with [`Error::Malformed`]; lines from no known family fail
//! with [`Error::UnrecognizedMessage`]. Callers drop both and keep polling.
//!
//! Classification also maintains the [`Discovery`] lists: `LIST` and
//! `INQUIRY` results append their address, and the end of an inquiry clears
//! the running flag.

use bttrx_core::{DeviceAddress, Error, Result};
use bttrx_line_io::protocol::tokenize;

use crate::commands::LIST_ADDRESS_FIELD;
use crate::discovery::Discovery;

/// What kind of line the module sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Nothing arrived, or a line that carries no event (inquiry/list
    /// headers, absorbed HFP status reports).
    Empty,
    /// A line that could not be classified. Only used for display.
    Unknown,
    /// `SET CONTROL GAIN <adc> <dac>`.
    SettingControlGain {
        adc_gain: String,
        dac_gain: String,
    },
    /// `SET BT AUTH * <pin>`.
    SettingPinCode { pin: String },
    /// Any other `SET` line.
    SettingUnknown,
    /// One `LIST` record; the address was appended to the active connections.
    ListResult { address: DeviceAddress },
    /// One `INQUIRY` record; the address was appended to the inquired devices.
    InquiryResult { address: DeviceAddress },
    /// `HFP-AG <id> READY`: the HFP link is up.
    HfpReady,
    /// `HFP-AG <id> CALLING`: the hands-free device wants a call.
    HfpCalling,
    /// `HFP-AG <id> DIAL ...`: the hands-free device dialed a number.
    HfpDial,
    /// `HFP-AG <id> NO CARRIER`: the call ended.
    HfpNoCarrier,
    /// `HFP-AG <id> UNKNOWN ...`: an AT command the module did not answer.
    HfpUnknownCommand,
    /// `NO CARRIER 0 ERROR ...`: the link was lost or never came up.
    NoCarrierLinkLoss,
    /// `NO CARRIER 1 ERROR ...`: the call link closed.
    NoCarrierCallEnded,
    /// `SSP CONFIRM <addr> <passkey>`: a pairing needs confirmation.
    SspConfirm,
    /// `CONNECT 1 SCO`: the audio link opened.
    ConnectSco,
    /// `NAME <addr> "<name>"`: a remote friendly name.
    NameResult,
}

/// One classified line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    /// The line as received, without terminator.
    pub raw: String,
}

impl Message {
    pub fn new(kind: MessageKind, raw: impl Into<String>) -> Self {
        Message {
            kind,
            raw: raw.into(),
        }
    }

    /// An empty poll result.
    pub fn empty() -> Self {
        Message::new(MessageKind::Empty, "")
    }

    /// Whether this message carries no event.
    pub fn is_empty(&self) -> bool {
        self.kind == MessageKind::Empty
    }

    /// The message's tokens.
    pub fn tokens(&self) -> Vec<&str> {
        tokenize(&self.raw)
    }
}

fn malformed(what: &str, line: &str) -> Error {
    Error::Malformed(format!("{what}: {line:?}"))
}

/// Classify one line from the module.
pub fn classify(line: &str, discovery: &mut Discovery) -> Result<Message> {
    let tokens = tokenize(line);
    let Some(&first) = tokens.first() else {
        return Ok(Message::new(MessageKind::Empty, line));
    };
    let second = tokens.get(1).copied();

    let kind = match first {
        "SET" => classify_setting(&tokens, line)?,
        "LIST" => {
            if tokens.len() <= 2 {
                // `LIST <n>` header
                MessageKind::Empty
            } else {
                let address = tokens
                    .get(LIST_ADDRESS_FIELD)
                    .map(|a| DeviceAddress::from(*a))
                    .ok_or_else(|| malformed("LIST record too short", line))?;
                discovery.add_active(address.clone());
                MessageKind::ListResult { address }
            }
        }
        "INQUIRY" => match tokens.len() {
            1 => return Err(malformed("INQUIRY without fields", line)),
            2 => {
                if second == Some("0") {
                    discovery.finish_inquiry();
                }
                MessageKind::Empty
            }
            _ => {
                let address = DeviceAddress::from(tokens[1]);
                discovery.add_inquired(address.clone());
                discovery.finish_inquiry();
                MessageKind::InquiryResult { address }
            }
        },
        "HFP-AG" => match tokens.get(2).copied() {
            Some("READY") => MessageKind::HfpReady,
            Some("CALLING") => MessageKind::HfpCalling,
            Some("DIAL") => MessageKind::HfpDial,
            Some("NO") if tokens.get(3) == Some(&"CARRIER") => MessageKind::HfpNoCarrier,
            Some("UNKNOWN") => MessageKind::HfpUnknownCommand,
            _ => return Err(malformed("unhandled HFP-AG event", line)),
        },
        "CONNECT" if tokens == ["CONNECT", "1", "SCO"] => MessageKind::ConnectSco,
        "NO" if second == Some("CARRIER") => {
            if tokens.get(3) != Some(&"ERROR") {
                return Err(malformed("NO CARRIER without ERROR", line));
            }
            match tokens.get(2).copied() {
                Some("1") => MessageKind::NoCarrierCallEnded,
                Some("0") => MessageKind::NoCarrierLinkLoss,
                _ => return Err(malformed("unhandled NO CARRIER link", line)),
            }
        }
        "SSP" if second == Some("CONFIRM") => {
            if tokens.len() < 3 {
                return Err(malformed("SSP CONFIRM without address", line));
            }
            MessageKind::SspConfirm
        }
        "NAME" if second.is_some_and(|s| s != "ERROR") => MessageKind::NameResult,
        _ => return Err(Error::UnrecognizedMessage(line.to_string())),
    };

    Ok(Message::new(kind, line))
}

fn classify_setting(tokens: &[&str], line: &str) -> Result<MessageKind> {
    match tokens {
        ["SET", "CONTROL", "GAIN", adc, dac] => Ok(MessageKind::SettingControlGain {
            adc_gain: adc.to_string(),
            dac_gain: dac.to_string(),
        }),
        ["SET", "BT", "AUTH", rest @ ..] => match rest.get(1) {
            Some(pin) => Ok(MessageKind::SettingPinCode {
                pin: pin.to_string(),
            }),
            None => Err(malformed("SET BT AUTH without PIN", line)),
        },
        _ => Ok(MessageKind::SettingUnknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_fresh(line: &str) -> Result<Message> {
        classify(line, &mut Discovery::default())
    }

    fn kind(line: &str) -> MessageKind {
        classify_fresh(line).unwrap().kind
    }

    #[test]
    fn empty_line() {
        let mut discovery = Discovery::default();
        let msg = classify("", &mut discovery).unwrap();
        assert_eq!(msg.kind, MessageKind::Empty);
        assert!(discovery.inquired_devices().is_empty());
        assert!(discovery.active_connections().is_empty());
    }

    #[test]
    fn control_gain() {
        for (a, b) in [("0", "0"), ("8", "10"), ("f", "e")] {
            let line = format!("SET CONTROL GAIN {a} {b}");
            assert_eq!(
                kind(&line),
                MessageKind::SettingControlGain {
                    adc_gain: a.into(),
                    dac_gain: b.into(),
                }
            );
        }
    }

    #[test]
    fn control_gain_wrong_arity_is_unknown_setting() {
        assert_eq!(kind("SET CONTROL GAIN 8"), MessageKind::SettingUnknown);
    }

    #[test]
    fn pin_code() {
        assert_eq!(
            kind("SET BT AUTH * 2342"),
            MessageKind::SettingPinCode { pin: "2342".into() }
        );
        assert!(matches!(
            classify_fresh("SET BT AUTH *"),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn other_settings() {
        assert_eq!(kind("SET BT NAME bt-trx-12abcd"), MessageKind::SettingUnknown);
        assert_eq!(kind("SET"), MessageKind::SettingUnknown);
    }

    #[test]
    fn list_result_appends_connection() {
        let mut discovery = Discovery::default();
        let msg = classify(
            "LIST 0 CONNECTED HFP-AG 667 0 0 7 8d 8d de:ad:be:ef:ca:fe 3 INCOMING ACTIVE SLAVE ENCRYPTED 0",
            &mut discovery,
        )
        .unwrap();
        assert_eq!(
            msg.kind,
            MessageKind::ListResult {
                address: DeviceAddress::new("de:ad:be:ef:ca:fe")
            }
        );
        assert_eq!(
            discovery.active_connections(),
            &[DeviceAddress::new("de:ad:be:ef:ca:fe")]
        );
    }

    #[test]
    fn list_header_is_no_event() {
        let mut discovery = Discovery::default();
        assert_eq!(classify("LIST 1", &mut discovery).unwrap().kind, MessageKind::Empty);
        assert!(discovery.active_connections().is_empty());
    }

    #[test]
    fn short_list_record_is_malformed() {
        let mut discovery = Discovery::default();
        assert!(matches!(
            classify("LIST 0 CONNECTED HFP-AG 667", &mut discovery),
            Err(Error::Malformed(_))
        ));
        assert!(discovery.active_connections().is_empty());
    }

    #[test]
    fn inquiry_result_appends_device_and_finishes() {
        let mut discovery = Discovery::default();
        discovery.begin_inquiry(true);
        let msg = classify("INQUIRY de:ad:be:ef:ca:fe 240404", &mut discovery).unwrap();
        assert!(matches!(msg.kind, MessageKind::InquiryResult { .. }));
        assert_eq!(
            discovery.inquired_devices(),
            &[DeviceAddress::new("de:ad:be:ef:ca:fe")]
        );
        assert!(!discovery.inquiry_running());
    }

    #[test]
    fn inquiry_zero_finishes_without_event() {
        let mut discovery = Discovery::default();
        discovery.begin_inquiry(true);
        let msg = classify("INQUIRY 0", &mut discovery).unwrap();
        assert_eq!(msg.kind, MessageKind::Empty);
        assert!(!discovery.inquiry_running());
    }

    #[test]
    fn inquiry_header_keeps_running() {
        let mut discovery = Discovery::default();
        discovery.begin_inquiry(true);
        assert_eq!(classify("INQUIRY 2", &mut discovery).unwrap().kind, MessageKind::Empty);
        assert!(discovery.inquiry_running());
    }

    #[test]
    fn bare_inquiry_is_malformed() {
        assert!(matches!(classify_fresh("INQUIRY"), Err(Error::Malformed(_))));
    }

    #[test]
    fn hfp_ag_events() {
        assert_eq!(kind("HFP-AG 0 READY"), MessageKind::HfpReady);
        assert_eq!(kind("HFP-AG 0 CALLING"), MessageKind::HfpCalling);
        assert_eq!(kind("HFP-AG 0 DIAL 0123456"), MessageKind::HfpDial);
        assert_eq!(kind("HFP-AG 0 NO CARRIER"), MessageKind::HfpNoCarrier);
        assert_eq!(
            kind("HFP-AG 0 UNKNOWN 9 AT+CSQ\\r"),
            MessageKind::HfpUnknownCommand
        );
    }

    #[test]
    fn hfp_ag_other_is_failure() {
        assert!(classify_fresh("HFP-AG 0 CONNECT").unwrap_err().is_classification_failure());
        assert!(classify_fresh("HFP-AG 0").unwrap_err().is_classification_failure());
    }

    #[test]
    fn connect_sco() {
        assert_eq!(kind("CONNECT 1 SCO"), MessageKind::ConnectSco);
        assert!(classify_fresh("CONNECT 0 HFP-AG 2").is_err());
    }

    #[test]
    fn no_carrier() {
        assert_eq!(
            kind("NO CARRIER 0 ERROR 0 RFC_CONNECTION_FAILED"),
            MessageKind::NoCarrierLinkLoss
        );
        assert_eq!(kind("NO CARRIER 1 ERROR 0"), MessageKind::NoCarrierCallEnded);
        assert!(matches!(
            classify_fresh("NO CARRIER 0 OK"),
            Err(Error::Malformed(_))
        ));
        assert!(matches!(
            classify_fresh("NO CARRIER 2 ERROR"),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn ssp_confirm() {
        assert_eq!(
            kind("SSP CONFIRM de:ad:be:ef:ca:fe 123456"),
            MessageKind::SspConfirm
        );
    }

    #[test]
    fn name_result() {
        assert_eq!(
            kind("NAME 00:11:22:33:44:55 \"Car Kit\""),
            MessageKind::NameResult
        );
        assert!(matches!(
            classify_fresh("NAME ERROR 0x1003 00:11:22:33:44:55"),
            Err(Error::UnrecognizedMessage(_))
        ));
    }

    #[test]
    fn unrecognized() {
        assert!(matches!(
            classify_fresh("READY."),
            Err(Error::UnrecognizedMessage(_))
        ));
        assert!(matches!(
            classify_fresh("RING 0 00:11:22:33:44:55 1 HFP"),
            Err(Error::UnrecognizedMessage(_))
        ));
    }

    #[test]
    fn raw_text_preserved() {
        let msg = classify_fresh("HFP-AG 0 READY").unwrap();
        assert_eq!(msg.raw, "HFP-AG 0 READY");
        assert_eq!(msg.tokens(), vec!["HFP-AG", "0", "READY"]);
    }
}
