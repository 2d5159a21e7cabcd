//! Parsers for `bluetoothctl` text output
//!
//! bluetoothctl decorates its output with ANSI colours, carriage returns and
//! an interactive prompt even when run non-interactively, so every parser
//! works on [`clean_lines`].

/// Name reported for devices that never advertised one
pub const UNKNOWN_DEVICE: &str = "Unknown Device";

/// Remove ANSI escape sequences and readline prompt markers
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    // CSI: parameters then one final byte in @..~
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
            }
            '\u{1}' | '\u{2}' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Output split into trimmed, non-empty lines without prompts
pub fn clean_lines(output: &str) -> Vec<String> {
    strip_ansi(output)
        .split(['\n', '\r'])
        .map(strip_prompt)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drop a leading `[bluetooth]# ` or `[Device Name]# ` prompt
fn strip_prompt(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with('[') {
        if let Some(end) = trimmed.find("]# ") {
            return &trimmed[end + 3..];
        }
        if let Some(end) = trimmed.find("]>") {
            return &trimmed[end + 2..];
        }
    }
    line
}

/// Upper-case a MAC address given with `:` or `-` separators
pub fn normalize_mac(input: &str) -> Option<String> {
    let candidate = input.trim().replace('-', ":").to_ascii_uppercase();
    is_valid_mac(&candidate).then_some(candidate)
}

/// `XX:XX:XX:XX:XX:XX` with hex digits
pub fn is_valid_mac(input: &str) -> bool {
    let parts: Vec<&str> = input.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

/// bluetoothctl prints `AA-BB-..` as the name of unnamed devices
fn display_name(mac: &str, name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || normalize_mac(name).as_deref() == Some(mac) {
        UNKNOWN_DEVICE.to_string()
    } else {
        name.to_string()
    }
}

/// Adapter summary from `bluetoothctl show`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterInfo {
    pub address: Option<String>,
    pub name: Option<String>,
    pub powered: bool,
    pub discovering: bool,
}

/// Parse `bluetoothctl show`; `None` when there is no controller
pub fn parse_show(output: &str) -> Option<AdapterInfo> {
    let mut info = AdapterInfo::default();
    let mut has_controller = false;

    for line in clean_lines(output) {
        if line.contains("No default controller available") {
            return None;
        }
        if let Some(rest) = line.strip_prefix("Controller ") {
            has_controller = true;
            info.address = rest.split_whitespace().next().and_then(normalize_mac);
        } else if let Some((key, value)) = line.split_once(':') {
            let value = value.trim();
            match key.trim() {
                "Name" => info.name = Some(value.to_string()),
                "Powered" => info.powered = value == "yes",
                "Discovering" => info.discovering = value == "yes",
                _ => {}
            }
        }
    }

    has_controller.then_some(info)
}

/// Parse `Device <MAC> <name>` lines from `bluetoothctl devices`
pub fn parse_devices(output: &str) -> Vec<(String, String)> {
    clean_lines(output)
        .iter()
        .filter_map(|line| {
            let rest = line.strip_prefix("Device ")?;
            let (mac, name) = rest.split_once(' ').unwrap_or((rest, ""));
            let mac = normalize_mac(mac)?;
            let name = display_name(&mac, name);
            Some((mac, name))
        })
        .collect()
}

/// Device details from `bluetoothctl info <MAC>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDetails {
    pub mac: String,
    pub name: Option<String>,
    pub paired: bool,
    pub trusted: bool,
    pub connected: bool,
    pub rssi: Option<i16>,
}

/// Parse `bluetoothctl info`; `None` if the device is unknown to BlueZ
pub fn parse_info(output: &str) -> Option<DeviceDetails> {
    let mut details: Option<DeviceDetails> = None;

    for line in clean_lines(output) {
        if line.contains("not available") {
            return None;
        }
        if let Some(rest) = line.strip_prefix("Device ") {
            let mac = rest.split_whitespace().next().and_then(normalize_mac)?;
            details = Some(DeviceDetails {
                mac,
                ..DeviceDetails::default()
            });
            continue;
        }
        let Some(d) = details.as_mut() else { continue };
        let Some((key, value)) = line.split_once(':') else { continue };
        let value = value.trim();
        match key.trim() {
            "Name" => d.name = Some(value.to_string()),
            "Alias" if d.name.is_none() => d.name = Some(value.to_string()),
            "Paired" => d.paired = value == "yes",
            "Trusted" => d.trusted = value == "yes",
            "Connected" => d.connected = value == "yes",
            "RSSI" => d.rssi = parse_rssi(value),
            _ => {}
        }
    }

    details
}

/// Parse `-60` or `0xffffffc4 (-60)`
pub fn parse_rssi(value: &str) -> Option<i16> {
    let value = value.trim();
    if let (Some(open), Some(close)) = (value.find('('), value.rfind(')')) {
        if open < close {
            return value[open + 1..close].trim().parse().ok();
        }
    }
    if let Some(hex) = value.strip_prefix("0x") {
        // 32-bit two's complement
        return u32::from_str_radix(hex, 16)
            .ok()
            .and_then(|v| i16::try_from(v as i32).ok());
    }
    value.parse().ok()
}

/// One line of `bluetoothctl scan on` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    New { mac: String, name: String },
    Rssi { mac: String, rssi: i16 },
    Name { mac: String, name: String },
    Deleted { mac: String },
}

pub fn parse_scan_line(line: &str) -> Option<ScanEvent> {
    let cleaned = clean_lines(line).into_iter().next()?;
    let (tag, rest) = cleaned.split_once(' ')?;
    let rest = rest.trim().strip_prefix("Device ")?;
    let (mac, payload) = rest.split_once(' ').unwrap_or((rest, ""));
    let mac = normalize_mac(mac)?;

    match tag {
        "[NEW]" => Some(ScanEvent::New {
            name: display_name(&mac, payload),
            mac,
        }),
        "[DEL]" => Some(ScanEvent::Deleted { mac }),
        "[CHG]" => {
            let (key, value) = payload.split_once(':')?;
            match key.trim() {
                "RSSI" => parse_rssi(value).map(|rssi| ScanEvent::Rssi { mac, rssi }),
                "Name" | "Alias" => Some(ScanEvent::Name {
                    name: display_name(&mac, value),
                    mac,
                }),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Last meaningful line, used in error messages
pub fn last_message(output: &str) -> Option<String> {
    clean_lines(output)
        .into_iter()
        .filter(|l| !l.starts_with("Attempting") && !l.starts_with("Waiting"))
        .last()
}

/// Whether bluetoothctl reported a failure in its text output
pub fn reports_failure(output: &str) -> bool {
    clean_lines(output).iter().any(|l| {
        l.starts_with("Failed")
            || l.contains("not available")
            || l.contains("No default controller")
            || l.contains("org.bluez.Error")
            || l.starts_with("Invalid command")
    })
}
