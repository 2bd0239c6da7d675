//! Device registry: folds mDNS records into [`AirplayDevice`] entries.

use std::collections::HashMap;

use airplay_core::{is_routable, AirplayDevice, DeviceType};
use airplay_mdns::{first_label, labels, DnsMessage, Rdata, ResourceRecord};
use tracing::{debug, trace, warn};

/// The set of devices seen so far, in discovery order.
///
/// Entries are keyed by their instance name and are never removed.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<AirplayDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[AirplayDevice] {
        &self.devices
    }

    pub fn get(&self, name: &str) -> Option<&AirplayDevice> {
        self.devices.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Owned copy of every entry, for handing to consumers.
    pub fn snapshot(&self) -> Vec<AirplayDevice> {
        self.devices.clone()
    }

    /// Apply one message. Returns whether any entry was created or changed.
    ///
    /// PTR answers register devices first; then every answer and additional
    /// record is matched against every device until no SRV record moves a
    /// device to a new hostname.
    pub fn apply(&mut self, msg: &DnsMessage) -> bool {
        let before = self.devices.clone();

        for record in &msg.answers {
            if let Rdata::Ptr(target) = &record.rdata {
                self.register(target);
            }
        }

        let records: Vec<&ResourceRecord> = msg.answers_and_extras().collect();
        for device in &mut self.devices {
            reconcile(device, &records);
        }

        self.devices != before
    }

    fn register(&mut self, target: &str) {
        let mut parts = labels(target);
        let (Some(name), Some(service)) = (parts.next(), parts.next()) else {
            return;
        };
        let Some(device_type) = DeviceType::from_service_label(service) else {
            trace!("Ignoring PTR target {} with service {}", target, service);
            return;
        };

        match self.devices.iter_mut().find(|d| d.name == name) {
            Some(device) => device.device_type = device_type,
            None => {
                debug!("New {} device: {}", device_type, name);
                self.devices.push(AirplayDevice::new(name, device_type));
            }
        }
    }
}

/// Run passes over `records` until one completes without a hostname change.
fn reconcile(device: &mut AirplayDevice, records: &[&ResourceRecord]) {
    let max_passes = records.len() + 1;
    let mut passes = 0;

    while apply_pass(device, records) {
        passes += 1;
        if passes >= max_passes {
            warn!(
                "Device {} hostname did not settle after {} passes, keeping {}",
                device.name, passes, device.hostname
            );
            break;
        }
    }
}

/// One scan over the records. Returns true as soon as an SRV record changes
/// the hostname, since earlier records may be owned by the new hostname.
fn apply_pass(device: &mut AirplayDevice, records: &[&ResourceRecord]) -> bool {
    for record in records {
        if !owns(device, record) {
            continue;
        }

        match &record.rdata {
            Rdata::A(ip) => {
                if is_routable(*ip) {
                    device.ip = Some(*ip);
                } else {
                    trace!("Ignoring unroutable address {} for {}", ip, device.name);
                }
            }
            Rdata::Txt(entries) => device.flags = parse_flags(entries),
            Rdata::Srv(srv) => {
                device.port = srv.port;
                if device.hostname != srv.target {
                    debug!(
                        "Device {} moved to host {} (was {:?})",
                        device.name, srv.target, device.hostname
                    );
                    device.hostname = srv.target.clone();
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// A record belongs to a device when its first label is the device name, or
/// when its full name is the device's hostname.
fn owns(device: &AirplayDevice, record: &ResourceRecord) -> bool {
    first_label(&record.name) == device.name
        || (!device.hostname.is_empty() && record.name == device.hostname)
}

/// Build the flag map from TXT `key=value` strings. Entries without `=`
/// become keys with an empty value.
fn parse_flags(entries: &[Vec<u8>]) -> HashMap<String, String> {
    entries
        .iter()
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let text = String::from_utf8_lossy(entry);
            match text.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (text.into_owned(), String::new()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use airplay_mdns::{fixtures, Srv};
    use std::net::Ipv4Addr;

    fn ptr(service: &str, instance: &str) -> ResourceRecord {
        ResourceRecord::new(
            format!("{}._tcp.local.", service),
            4500,
            Rdata::Ptr(format!("{}.{}._tcp.local.", instance, service)),
        )
    }

    fn srv(owner: &str, target: &str, port: u16) -> ResourceRecord {
        ResourceRecord::new(
            owner,
            120,
            Rdata::Srv(Srv {
                priority: 0,
                weight: 0,
                port,
                target: target.to_string(),
            }),
        )
    }

    fn txt(owner: &str, entries: &[&str]) -> ResourceRecord {
        ResourceRecord::new(
            owner,
            4500,
            Rdata::Txt(entries.iter().map(|e| e.as_bytes().to_vec()).collect()),
        )
    }

    fn a(owner: &str, ip: [u8; 4]) -> ResourceRecord {
        ResourceRecord::new(owner, 120, Rdata::A(Ipv4Addr::from(ip)))
    }

    fn message(answers: Vec<ResourceRecord>, extras: Vec<ResourceRecord>) -> DnsMessage {
        let mut msg = DnsMessage::new();
        msg.is_response = true;
        answers.into_iter().for_each(|r| msg.add_answer(r));
        extras.into_iter().for_each(|r| msg.add_extra(r));
        msg
    }

    mod registration {
        use super::*;

        #[test]
        fn ptr_creates_device_with_type() {
            let mut registry = DeviceRegistry::new();
            let changed = registry.apply(&message(vec![ptr("_raop", "Foo")], vec![]));

            assert!(changed);
            let device = registry.get("Foo").unwrap();
            assert_eq!(device.device_type, DeviceType::Airplay);
            assert!(device.hostname.is_empty());
        }

        #[test]
        fn touch_remote_is_a_remote() {
            let mut registry = DeviceRegistry::new();
            registry.apply(&message(vec![ptr("_touch-remote", "Phone")], vec![]));
            assert_eq!(registry.get("Phone").unwrap().device_type, DeviceType::Remote);
        }

        #[test]
        fn unknown_service_is_ignored() {
            let mut registry = DeviceRegistry::new();
            let changed = registry.apply(&message(vec![ptr("_airport", "Base")], vec![]));
            assert!(!changed);
            assert!(registry.is_empty());
        }

        #[test]
        fn repeated_ptr_does_not_duplicate() {
            let mut registry = DeviceRegistry::new();
            let msg = message(vec![ptr("_raop", "Foo")], vec![]);
            registry.apply(&msg);
            let changed = registry.apply(&msg);

            assert!(!changed);
            assert_eq!(registry.len(), 1);
        }
    }

    mod reconciliation {
        use super::*;

        fn assert_foo_resolved(registry: &DeviceRegistry) {
            let device = registry.get("Foo").unwrap();
            assert_eq!(device.device_type, DeviceType::Airplay);
            assert_eq!(device.hostname, "Foo.local.");
            assert_eq!(device.port, 5000);
            assert_eq!(device.audio_channels(), 2);
            assert_eq!(device.flag("tp"), Some("UDP"));
        }

        #[test]
        fn txt_then_srv() {
            let mut registry = DeviceRegistry::new();
            registry.apply(&message(
                vec![ptr("_raop", "Foo")],
                vec![
                    txt("Foo._raop._tcp.local.", &["ch=2", "tp=UDP"]),
                    srv("Foo._raop._tcp.local.", "Foo.local.", 5000),
                ],
            ));
            assert_foo_resolved(&registry);
        }

        #[test]
        fn srv_then_txt() {
            let mut registry = DeviceRegistry::new();
            registry.apply(&message(
                vec![ptr("_raop", "Foo")],
                vec![
                    srv("Foo._raop._tcp.local.", "Foo.local.", 5000),
                    txt("Foo._raop._tcp.local.", &["ch=2", "tp=UDP"]),
                ],
            ));
            assert_foo_resolved(&registry);
        }

        #[test]
        fn address_before_srv_is_applied_after_hostname_change() {
            let mut registry = DeviceRegistry::new();
            registry.apply(&message(
                vec![ptr("_raop", "Foo")],
                vec![
                    a("Foo-Host.local.", [192, 168, 1, 50]),
                    srv("Foo._raop._tcp.local.", "Foo-Host.local.", 7000),
                ],
            ));

            let device = registry.get("Foo").unwrap();
            assert_eq!(device.hostname, "Foo-Host.local.");
            assert_eq!(device.ip, Some(Ipv4Addr::new(192, 168, 1, 50)));
        }

        #[test]
        fn link_local_address_is_rejected() {
            let mut registry = DeviceRegistry::new();
            registry.apply(&message(
                vec![ptr("_raop", "Foo")],
                vec![
                    srv("Foo._raop._tcp.local.", "Foo.local.", 5000),
                    a("Foo.local.", [169, 254, 3, 4]),
                ],
            ));
            assert_eq!(registry.get("Foo").unwrap().ip, None);
        }

        #[test]
        fn later_message_updates_known_device() {
            let mut registry = DeviceRegistry::new();
            registry.apply(&message(
                vec![ptr("_raop", "Foo")],
                vec![srv("Foo._raop._tcp.local.", "Foo-Host.local.", 5000)],
            ));

            // No PTR this time: the A record is matched by hostname alone.
            let changed =
                registry.apply(&message(vec![a("Foo-Host.local.", [10, 0, 0, 9])], vec![]));
            assert!(changed);
            assert_eq!(registry.get("Foo").unwrap().ip, Some(Ipv4Addr::new(10, 0, 0, 9)));
        }

        #[test]
        fn conflicting_srv_records_terminate() {
            let mut registry = DeviceRegistry::new();
            registry.apply(&message(
                vec![ptr("_raop", "Foo")],
                vec![
                    srv("Foo._raop._tcp.local.", "One.local.", 5000),
                    srv("Foo._raop._tcp.local.", "Two.local.", 5001),
                ],
            ));

            let host = &registry.get("Foo").unwrap().hostname;
            assert!(host == "One.local." || host == "Two.local.");
        }

        #[test]
        fn txt_entry_without_separator() {
            let flags = parse_flags(&[b"flag".to_vec(), b"k=a=b".to_vec(), Vec::new()]);
            assert_eq!(flags.len(), 2);
            assert_eq!(flags["flag"], "");
            assert_eq!(flags["k"], "a=b");
        }
    }

    mod captured {
        use super::*;

        #[test]
        fn airport_express_announcement() {
            let bytes = hex::decode(fixtures::AIRPORT_ANNOUNCEMENT).unwrap();
            let msg = DnsMessage::parse(&bytes).unwrap();

            let mut registry = DeviceRegistry::new();
            assert!(registry.apply(&msg));
            assert_eq!(registry.len(), 1);

            let device = registry.get("0024369AC88C@Living Room").unwrap();
            assert_eq!(device.device_type, DeviceType::Airplay);
            assert_eq!(device.hostname, "Living-Room.local.");
            assert_eq!(device.port, 5000);
            assert_eq!(device.ip, Some(Ipv4Addr::new(192, 168, 1, 120)));
            assert_eq!(device.audio_channels(), 2);
            assert_eq!(device.sample_rate(), 44100);
            assert_eq!(device.sample_size(), 16);
            assert_eq!(device.compression_types(), vec![0, 1]);
            assert_eq!(device.encryption_types(), vec![0, 1]);
            assert!(device.password_required());
            assert_eq!(device.transports(), vec!["TCP", "UDP"]);
            assert_eq!(device.model(), Some("AirPort4,107"));
        }
    }
}
