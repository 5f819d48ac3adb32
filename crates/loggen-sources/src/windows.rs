//! Windows Event Log generators for the Security, System, and Application
//! channels, with the `winlog.*` field layout Elastic agents produce.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use loggen_core::catalog::{EventGenerator, GeneratorError};
use loggen_core::types::Event;

use crate::common::{base_doc, extend, pick, pick_weighted, random_port, random_private_ip, random_public_ip};

pub const SECURITY_DATA_STREAM: &str = "logs-windows.security-default";
pub const SYSTEM_DATA_STREAM: &str = "logs-windows.system-default";
pub const APPLICATION_DATA_STREAM: &str = "logs-windows.application-default";

const USERNAMES: &[&str] = &[
    "admin",
    "jsmith",
    "mwilson",
    "agarcia",
    "lchen",
    "kpatel",
    "rjohnson",
    "slee",
    "dkim",
    "SYSTEM",
    "LOCAL SERVICE",
    "NETWORK SERVICE",
    "Administrator",
];

const COMPUTER_NAMES: &[&str] = &[
    "DESKTOP-ABC123",
    "WORKSTATION-01",
    "SERVER-DC01",
    "LAPTOP-USER1",
    "PC-FINANCE-02",
    "SRV-APP-01",
];

const DOMAINS: &[&str] = &["CORP", "CONTOSO", "WORKGROUP", "NT AUTHORITY"];

const PROCESSES: &[(&str, &str)] = &[
    ("chrome.exe", "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe"),
    ("explorer.exe", "C:\\Windows\\explorer.exe"),
    ("svchost.exe", "C:\\Windows\\System32\\svchost.exe"),
    ("powershell.exe", "C:\\Windows\\System32\\WindowsPowerShell\\v1.0\\powershell.exe"),
    ("cmd.exe", "C:\\Windows\\System32\\cmd.exe"),
    ("notepad.exe", "C:\\Windows\\System32\\notepad.exe"),
    ("taskmgr.exe", "C:\\Windows\\System32\\taskmgr.exe"),
    ("msiexec.exe", "C:\\Windows\\System32\\msiexec.exe"),
    ("outlook.exe", "C:\\Program Files\\Microsoft Office\\root\\Office16\\OUTLOOK.EXE"),
    ("excel.exe", "C:\\Program Files\\Microsoft Office\\root\\Office16\\EXCEL.EXE"),
];

const SERVICES: &[(&str, &str)] = &[
    ("wuauserv", "Windows Update"),
    ("BITS", "Background Intelligent Transfer Service"),
    ("Dnscache", "DNS Client"),
    ("EventLog", "Windows Event Log"),
    ("Spooler", "Print Spooler"),
    ("W32Time", "Windows Time"),
    ("WinDefend", "Windows Defender Antivirus Service"),
];

const APPLICATION_SOURCES: &[&str] = &[
    "Application Error",
    "Windows Error Reporting",
    ".NET Runtime",
    "VSS",
    "MsiInstaller",
    "SecurityCenter",
];

const LOGON_TYPES: &[(u32, &str)] = &[
    (2, "Interactive"),
    (3, "Network"),
    (4, "Batch"),
    (5, "Service"),
    (7, "Unlock"),
    (10, "RemoteInteractive"),
    (11, "CachedInteractive"),
];

const SECURITY_EVENTS: &[(u32, u32, &str)] = &[
    (4624, 40, "An account was successfully logged on"),
    (4625, 10, "An account failed to log on"),
    (4688, 30, "A new process has been created"),
    (4689, 15, "A process has exited"),
    (4672, 5, "Special privileges assigned to new logon"),
];

fn random_sid(rng: &mut SmallRng) -> String {
    format!(
        "S-1-5-21-{}-{}",
        rng.gen_range(1_000_000_000u64..=9_999_999_999),
        rng.gen_range(1_000..=9_999)
    )
}

fn random_logon_id(rng: &mut SmallRng) -> String {
    format!("{:#x}", rng.gen_range(0x10000..=0xFFFFF))
}

fn windows_host(computer: &str) -> Value {
    json!({
        "name": computer,
        "hostname": computer,
        "os": {
            "family": "windows",
            "name": "Windows Server 2019",
            "platform": "windows",
        },
    })
}

pub struct WindowsSecurity {
    rng: SmallRng,
}

pub fn new_security() -> Box<dyn EventGenerator> {
    Box::new(WindowsSecurity {
        rng: SmallRng::from_entropy(),
    })
}

impl WindowsSecurity {
    fn base_security_doc(
        rng: &mut SmallRng,
        event_id: u32,
        action: &str,
    ) -> Result<Value, GeneratorError> {
        let computer = *pick(rng, COMPUTER_NAMES)?;
        let is_logon = matches!(event_id, 4624 | 4625 | 4672);
        let mut doc = base_doc("windows.security", "windows");
        extend(
            &mut doc,
            json!({
                "host": windows_host(computer),
                "winlog": {
                    "channel": "Security",
                    "event_id": event_id.to_string(),
                    "provider_name": "Microsoft-Windows-Security-Auditing",
                    "computer_name": computer,
                    "record_id": rng.gen_range(100_000..=999_999u32),
                    "task": if is_logon { "Logon" } else { "Process Creation" },
                    "keywords": [if event_id == 4625 { "Audit Failure" } else { "Audit Success" }],
                    "opcode": "Info",
                },
                "event": {
                    "code": event_id.to_string(),
                    "action": action,
                    "category": [if matches!(event_id, 4624 | 4625) { "authentication" } else { "process" }],
                    "type": [if matches!(event_id, 4624 | 4688) { "start" } else { "end" }],
                    "outcome": if event_id == 4625 { "failure" } else { "success" },
                },
                "log": { "level": "information" },
            }),
        );
        Ok(doc)
    }

    fn logon_success(rng: &mut SmallRng) -> Result<Value, GeneratorError> {
        let username = *pick(rng, USERNAMES)?;
        let domain = *pick(rng, DOMAINS)?;
        let (logon_type, logon_name) = *pick(rng, LOGON_TYPES)?;
        let ip = random_private_ip(rng);
        let port = random_port(rng);

        let mut doc = Self::base_security_doc(rng, 4624, "An account was successfully logged on")?;
        let workstation = doc["host"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        extend(
            &mut doc,
            json!({
                "user": {
                    "name": username,
                    "domain": domain,
                    "id": random_sid(rng),
                },
                "source": { "ip": &ip, "port": port },
                "winlog": {
                    "logon": {
                        "id": random_logon_id(rng),
                        "type": logon_name,
                    },
                    "event_data": {
                        "TargetUserName": username,
                        "TargetDomainName": domain,
                        "LogonType": logon_type.to_string(),
                        "IpAddress": &ip,
                        "IpPort": port.to_string(),
                        "WorkstationName": workstation,
                        "LogonProcessName": *pick(rng, &["User32", "Advapi", "NtLmSsp"])?,
                        "AuthenticationPackageName": *pick(rng, &["NTLM", "Kerberos", "Negotiate"])?,
                    },
                },
                "message": format!("An account was successfully logged on. Subject: {domain}\\{username}"),
            }),
        );
        Ok(doc)
    }

    fn logon_failure(rng: &mut SmallRng) -> Result<Value, GeneratorError> {
        const FAILURES: &[(&str, &str, &str)] = &[
            ("0xc000006d", "0xc000006a", "Unknown user name or bad password"),
            ("0xc000006d", "0xc0000064", "User name does not exist"),
            ("0xc0000234", "0x0", "Account locked out"),
            ("0xc0000072", "0x0", "Account disabled"),
        ];
        let username = *pick(rng, USERNAMES)?;
        let domain = *pick(rng, DOMAINS)?;
        let (logon_type, _) = *pick(rng, LOGON_TYPES)?;
        let (status, sub_status, reason) = *pick(rng, FAILURES)?;
        let ip = random_public_ip(rng);
        let port = random_port(rng);

        let mut doc = Self::base_security_doc(rng, 4625, "An account failed to log on")?;
        extend(
            &mut doc,
            json!({
                "user": { "name": username, "domain": domain },
                "source": { "ip": &ip, "port": port },
                "winlog": {
                    "event_data": {
                        "TargetUserName": username,
                        "TargetDomainName": domain,
                        "LogonType": logon_type.to_string(),
                        "IpAddress": &ip,
                        "IpPort": port.to_string(),
                        "Status": status,
                        "SubStatus": sub_status,
                        "FailureReason": reason,
                    },
                },
                "message": format!(
                    "An account failed to log on. Subject: {domain}\\{username}. Reason: {reason}"
                ),
            }),
        );
        Ok(doc)
    }

    fn process_create(rng: &mut SmallRng) -> Result<Value, GeneratorError> {
        let (name, path) = *pick(rng, PROCESSES)?;
        let (parent_name, parent_path) = *pick(rng, PROCESSES)?;
        let username = *pick(rng, USERNAMES)?;
        let domain = *pick(rng, DOMAINS)?;
        let pid: u32 = rng.gen_range(1_000..=65_000);
        let parent_pid: u32 = rng.gen_range(1_000..=65_000);

        let mut doc = Self::base_security_doc(rng, 4688, "A new process has been created")?;
        extend(
            &mut doc,
            json!({
                "process": {
                    "name": name,
                    "executable": path,
                    "pid": pid,
                    "parent": {
                        "name": parent_name,
                        "executable": parent_path,
                        "pid": parent_pid,
                    },
                },
                "user": { "name": username, "domain": domain },
                "winlog": {
                    "event_data": {
                        "NewProcessId": format!("{pid:#x}"),
                        "NewProcessName": path,
                        "ProcessId": format!("{parent_pid:#x}"),
                        "ParentProcessName": parent_path,
                        "SubjectUserName": username,
                        "SubjectDomainName": domain,
                        "TokenElevationType": *pick(rng, &["%%1936", "%%1937", "%%1938"])?,
                    },
                },
                "message": format!("A new process has been created. Process: {name} by {domain}\\{username}"),
            }),
        );
        Ok(doc)
    }

    fn process_exit(rng: &mut SmallRng) -> Result<Value, GeneratorError> {
        let (name, path) = *pick(rng, PROCESSES)?;
        let username = *pick(rng, USERNAMES)?;
        let domain = *pick(rng, DOMAINS)?;
        let pid: u32 = rng.gen_range(1_000..=65_000);
        let exit_code = *pick(rng, &[0i64, 1, -1])?;

        let mut doc = Self::base_security_doc(rng, 4689, "A process has exited")?;
        extend(
            &mut doc,
            json!({
                "process": {
                    "name": name,
                    "executable": path,
                    "pid": pid,
                    "exit_code": exit_code,
                },
                "user": { "name": username, "domain": domain },
                "winlog": {
                    "event_data": {
                        "ProcessId": format!("{pid:#x}"),
                        "ProcessName": path,
                        "SubjectUserName": username,
                        "SubjectDomainName": domain,
                        "Status": format!("{exit_code:#x}"),
                    },
                },
                "message": format!("A process has exited. Process: {name}"),
            }),
        );
        Ok(doc)
    }

    fn special_privilege(rng: &mut SmallRng) -> Result<Value, GeneratorError> {
        const PRIVILEGES: &[&str] = &[
            "SeSecurityPrivilege",
            "SeTakeOwnershipPrivilege",
            "SeLoadDriverPrivilege",
            "SeBackupPrivilege",
            "SeRestorePrivilege",
            "SeDebugPrivilege",
            "SeSystemEnvironmentPrivilege",
            "SeImpersonatePrivilege",
        ];
        let username = *pick(rng, USERNAMES)?;
        let domain = *pick(rng, DOMAINS)?;
        let count = rng.gen_range(1..=4);
        let assigned: Vec<&str> = PRIVILEGES.choose_multiple(rng, count).copied().collect();

        let mut doc =
            Self::base_security_doc(rng, 4672, "Special privileges assigned to new logon")?;
        extend(
            &mut doc,
            json!({
                "user": { "name": username, "domain": domain },
                "winlog": {
                    "event_data": {
                        "SubjectUserName": username,
                        "SubjectDomainName": domain,
                        "PrivilegeList": assigned.join("\n\t\t\t"),
                    },
                },
                "message": format!("Special privileges assigned to new logon. User: {domain}\\{username}"),
            }),
        );
        Ok(doc)
    }
}

impl EventGenerator for WindowsSecurity {
    fn generate(&mut self) -> Result<Event, GeneratorError> {
        let rng = &mut self.rng;
        let (event_id, _, _) = *pick_weighted(rng, SECURITY_EVENTS, |e| e.1)?;
        let doc = match event_id {
            4624 => Self::logon_success(rng)?,
            4625 => Self::logon_failure(rng)?,
            4688 => Self::process_create(rng)?,
            4689 => Self::process_exit(rng)?,
            _ => Self::special_privilege(rng)?,
        };
        Ok(Event::new(doc, SECURITY_DATA_STREAM))
    }
}

const SYSTEM_EVENTS: &[(u32, u32, &str)] = &[
    (7036, 40, "Service state change"),
    (7040, 20, "Service start type changed"),
    (6005, 15, "Event Log service started"),
    (6006, 10, "Event Log service stopped"),
    (1, 15, "System time synchronized"),
];

pub struct WindowsSystem {
    rng: SmallRng,
}

pub fn new_system() -> Box<dyn EventGenerator> {
    Box::new(WindowsSystem {
        rng: SmallRng::from_entropy(),
    })
}

impl EventGenerator for WindowsSystem {
    fn generate(&mut self) -> Result<Event, GeneratorError> {
        let rng = &mut self.rng;
        let (event_id, _, action) = *pick_weighted(rng, SYSTEM_EVENTS, |e| e.1)?;
        let computer = *pick(rng, COMPUTER_NAMES)?;
        let service_event = matches!(event_id, 7036 | 7040);

        let mut doc = base_doc("windows.system", "windows");
        extend(
            &mut doc,
            json!({
                "host": windows_host(computer),
                "winlog": {
                    "channel": "System",
                    "event_id": event_id.to_string(),
                    "provider_name": if service_event { "Service Control Manager" } else { "EventLog" },
                    "computer_name": computer,
                    "record_id": rng.gen_range(100_000..=999_999u32),
                    "keywords": ["Classic"],
                    "opcode": "Info",
                },
                "event": {
                    "code": event_id.to_string(),
                    "action": action,
                    "category": ["configuration"],
                    "type": ["change"],
                },
                "log": { "level": "information" },
            }),
        );

        if service_event {
            let (_, display) = *pick(rng, SERVICES)?;
            let state = *pick(rng, &["running", "stopped"])?;
            extend(
                &mut doc,
                json!({
                    "winlog": { "event_data": { "param1": display, "param2": state } },
                    "message": format!("The {display} service entered the {state} state."),
                }),
            );
        } else {
            let message = match event_id {
                6005 => "The Event log service was started.",
                6006 => "The Event log service was stopped.",
                _ => "The system time has been synchronized.",
            };
            extend(&mut doc, json!({ "message": message }));
        }

        Ok(Event::new(doc, SYSTEM_DATA_STREAM))
    }
}

const APPLICATION_EVENTS: &[(u32, u32, &str, &str)] = &[
    (1000, 30, "Application error", "error"),
    (1001, 25, "Windows Error Reporting", "information"),
    (1002, 20, "Application hang", "error"),
    (11707, 15, "Installation completed successfully", "information"),
    (11724, 10, "Product removal completed", "information"),
];

pub struct WindowsApplication {
    rng: SmallRng,
}

pub fn new_application() -> Box<dyn EventGenerator> {
    Box::new(WindowsApplication {
        rng: SmallRng::from_entropy(),
    })
}

impl EventGenerator for WindowsApplication {
    fn generate(&mut self) -> Result<Event, GeneratorError> {
        let rng = &mut self.rng;
        let (event_id, _, action, level) = *pick_weighted(rng, APPLICATION_EVENTS, |e| e.1)?;
        let computer = *pick(rng, COMPUTER_NAMES)?;
        let provider = *pick(rng, APPLICATION_SOURCES)?;
        let (process_name, _) = *pick(rng, PROCESSES)?;

        let mut doc = base_doc("windows.application", "windows");
        extend(
            &mut doc,
            json!({
                "host": windows_host(computer),
                "winlog": {
                    "channel": "Application",
                    "event_id": event_id.to_string(),
                    "provider_name": provider,
                    "computer_name": computer,
                    "record_id": rng.gen_range(100_000..=999_999u32),
                    "keywords": ["Classic"],
                    "opcode": "Info",
                },
                "event": {
                    "code": event_id.to_string(),
                    "action": action,
                    "category": ["process"],
                    "type": [if level == "error" { "error" } else { "info" }],
                },
                "log": { "level": level },
            }),
        );

        match event_id {
            1000 => extend(
                &mut doc,
                json!({
                    "winlog": {
                        "event_data": {
                            "param1": process_name,
                            "param2": "10.0.19041.1",
                            "param3": *pick(rng, &["c0000005", "c0000094", "c0000374"])?,
                            "param4": random_logon_id(rng),
                        },
                    },
                    "message": format!(
                        "Faulting application name: {process_name}, Faulting module: ntdll.dll"
                    ),
                }),
            ),
            1002 => extend(
                &mut doc,
                json!({
                    "winlog": {
                        "event_data": { "param1": process_name, "param2": "10.0.19041.1" },
                    },
                    "message": format!("The program {process_name} stopped interacting with Windows."),
                }),
            ),
            11707 => extend(
                &mut doc,
                json!({ "message": "Product: Microsoft Visual C++ 2019 -- Installation completed successfully." }),
            ),
            11724 => extend(
                &mut doc,
                json!({ "message": "Product: Microsoft Visual C++ 2019 -- Removal completed successfully." }),
            ),
            _ => extend(
                &mut doc,
                json!({ "message": "Windows Error Reporting: Fault bucket, type 0" }),
            ),
        }

        Ok(Event::new(doc, APPLICATION_DATA_STREAM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_documents_match_their_event_code() {
        let mut generator = WindowsSecurity {
            rng: SmallRng::seed_from_u64(11),
        };
        for _ in 0..100 {
            let event = generator.generate().unwrap();
            let doc = &event.doc;
            let code = doc["event"]["code"].as_str().unwrap();
            assert_eq!(doc["winlog"]["event_id"], code);
            assert_eq!(doc["winlog"]["channel"], "Security");
            if code == "4625" {
                assert_eq!(doc["event"]["outcome"], "failure");
                assert_eq!(doc["winlog"]["keywords"][0], "Audit Failure");
            } else {
                assert_eq!(doc["event"]["outcome"], "success");
            }
        }
    }

    #[test]
    fn system_service_events_carry_the_service_display_name() {
        let mut generator = WindowsSystem {
            rng: SmallRng::seed_from_u64(11),
        };
        for _ in 0..100 {
            let event = generator.generate().unwrap();
            let doc = &event.doc;
            let code = doc["winlog"]["event_id"].as_str().unwrap();
            if matches!(code, "7036" | "7040") {
                let display = doc["winlog"]["event_data"]["param1"].as_str().unwrap();
                assert!(doc["message"].as_str().unwrap().contains(display));
            }
        }
    }

    #[test]
    fn application_error_events_use_the_error_level() {
        let mut generator = WindowsApplication {
            rng: SmallRng::seed_from_u64(11),
        };
        for _ in 0..100 {
            let event = generator.generate().unwrap();
            let doc = &event.doc;
            let code = doc["winlog"]["event_id"].as_str().unwrap();
            match code {
                "1000" | "1002" => assert_eq!(doc["log"]["level"], "error"),
                _ => assert_eq!(doc["log"]["level"], "information"),
            }
        }
    }
}
