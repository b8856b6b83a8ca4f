/*!
Catalog of third-party drivers frequently involved in crashes.
*/

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub enum DriverCategory {
    Graphics,
    Network,
    Wireless,
    Storage,
    Audio,
    Antivirus,
    AntiCheat,
    Virtualization,
    HardwareMonitor,
    DiscEmulation,
    Peripheral,
    Other,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub struct DriverInfo {
    /// Lowercase file name.
    pub name: &'static str,
    pub manufacturer: &'static str,
    pub category: DriverCategory,
    pub known_issues: &'static str,
    pub stop_codes: &'static [u32],
    pub remediation: &'static str,
}

impl DriverInfo {
    pub fn is_associated_with(&self, code: u32) -> bool {
        self.stop_codes.contains(&code)
    }
}

const GPU_CODES: &[u32] = &[0x116, 0x117, 0x119, 0x10E, 0x113, 0x50, 0x3B, 0x7E, 0xD1, 0x133];
const GPU_FIX: &str =
    "perform a clean install of the latest graphics driver (use DDU), and remove any GPU overclock";

const NET_CODES: &[u32] = &[0xD1, 0x0A, 0x3B, 0x50, 0x7E, 0x1E, 0x9F, 0x133];
const NET_FIX: &str = "install the latest network driver from the adapter or laptop vendor";

const STORAGE_CODES: &[u32] = &[0x7B, 0x9F, 0xF4, 0xD1, 0x133, 0xEF, 0x7A];
const STORAGE_FIX: &str =
    "update the storage controller driver or switch to the inbox Microsoft driver";

const AV_CODES: &[u32] = &[0x3B, 0x50, 0x7E, 0x1E, 0xD1, 0x0A, 0x139, 0x18, 0x19, 0xC2];
const AV_FIX: &str = "update the security product or uninstall it with the vendor removal tool";

const ANTICHEAT_CODES: &[u32] = &[0x3B, 0x50, 0x7E, 0x1E, 0x139, 0x109, 0xC4];
const ANTICHEAT_FIX: &str = "update or reinstall the game's anti-cheat service";

const LOWLEVEL_CODES: &[u32] = &[0x3B, 0x50, 0x7E, 0x1E, 0xD1, 0x0A, 0x139];
const LOWLEVEL_FIX: &str =
    "uninstall the monitoring or tuning utility, its driver allows raw hardware access";

#[rustfmt::skip]
static CATALOG: &[DriverInfo] = &[
    DriverInfo { name: "nvlddmkm.sys", manufacturer: "NVIDIA", category: DriverCategory::Graphics, known_issues: "display driver timeouts and memory corruption under load", stop_codes: GPU_CODES, remediation: GPU_FIX },
    DriverInfo { name: "nvhda64v.sys", manufacturer: "NVIDIA", category: DriverCategory::Audio, known_issues: "hdmi audio driver power transition hangs", stop_codes: &[0x9F, 0xD1], remediation: GPU_FIX },
    DriverInfo { name: "atikmdag.sys", manufacturer: "AMD", category: DriverCategory::Graphics, known_issues: "display driver timeouts on older radeon drivers", stop_codes: GPU_CODES, remediation: GPU_FIX },
    DriverInfo { name: "atikmpag.sys", manufacturer: "AMD", category: DriverCategory::Graphics, known_issues: "miniport driver timeouts", stop_codes: GPU_CODES, remediation: GPU_FIX },
    DriverInfo { name: "amdkmdag.sys", manufacturer: "AMD", category: DriverCategory::Graphics, known_issues: "display driver timeouts and page faults", stop_codes: GPU_CODES, remediation: GPU_FIX },
    DriverInfo { name: "amdkmpfd.sys", manufacturer: "AMD", category: DriverCategory::Graphics, known_issues: "pcie filter driver faults after chipset updates", stop_codes: &[0x3B, 0x7E, 0x9F], remediation: "update the AMD chipset driver package" },
    DriverInfo { name: "igdkmd64.sys", manufacturer: "Intel", category: DriverCategory::Graphics, known_issues: "integrated graphics timeouts and page faults", stop_codes: GPU_CODES, remediation: GPU_FIX },
    DriverInfo { name: "igdkmdn64.sys", manufacturer: "Intel", category: DriverCategory::Graphics, known_issues: "integrated graphics timeouts", stop_codes: GPU_CODES, remediation: GPU_FIX },
    DriverInfo { name: "rt640x64.sys", manufacturer: "Realtek", category: DriverCategory::Network, known_issues: "ethernet driver faults at raised irql", stop_codes: NET_CODES, remediation: NET_FIX },
    DriverInfo { name: "rtwlane.sys", manufacturer: "Realtek", category: DriverCategory::Wireless, known_issues: "wi-fi driver faults after sleep", stop_codes: NET_CODES, remediation: NET_FIX },
    DriverInfo { name: "rtwlane02.sys", manufacturer: "Realtek", category: DriverCategory::Wireless, known_issues: "wi-fi driver faults after sleep", stop_codes: NET_CODES, remediation: NET_FIX },
    DriverInfo { name: "netwtw04.sys", manufacturer: "Intel", category: DriverCategory::Wireless, known_issues: "wi-fi driver irql violations", stop_codes: NET_CODES, remediation: NET_FIX },
    DriverInfo { name: "netwtw06.sys", manufacturer: "Intel", category: DriverCategory::Wireless, known_issues: "wi-fi driver irql violations", stop_codes: NET_CODES, remediation: NET_FIX },
    DriverInfo { name: "netwtw08.sys", manufacturer: "Intel", category: DriverCategory::Wireless, known_issues: "wi-fi driver irql violations", stop_codes: NET_CODES, remediation: NET_FIX },
    DriverInfo { name: "netwtw10.sys", manufacturer: "Intel", category: DriverCategory::Wireless, known_issues: "wi-fi driver irql violations", stop_codes: NET_CODES, remediation: NET_FIX },
    DriverInfo { name: "e1i63x64.sys", manufacturer: "Intel", category: DriverCategory::Network, known_issues: "ethernet driver faults", stop_codes: NET_CODES, remediation: NET_FIX },
    DriverInfo { name: "e1d68x64.sys", manufacturer: "Intel", category: DriverCategory::Network, known_issues: "ethernet driver faults", stop_codes: NET_CODES, remediation: NET_FIX },
    DriverInfo { name: "bcmwl63a.sys", manufacturer: "Broadcom", category: DriverCategory::Wireless, known_issues: "wi-fi driver irql violations", stop_codes: NET_CODES, remediation: NET_FIX },
    DriverInfo { name: "killer.sys", manufacturer: "Rivet Networks", category: DriverCategory::Network, known_issues: "traffic shaping filter crashes", stop_codes: NET_CODES, remediation: "uninstall Killer Control Center and keep only the base driver" },
    DriverInfo { name: "iastora.sys", manufacturer: "Intel", category: DriverCategory::Storage, known_issues: "rapid storage technology timeouts", stop_codes: STORAGE_CODES, remediation: STORAGE_FIX },
    DriverInfo { name: "iastorac.sys", manufacturer: "Intel", category: DriverCategory::Storage, known_issues: "rapid storage technology timeouts", stop_codes: STORAGE_CODES, remediation: STORAGE_FIX },
    DriverInfo { name: "iastorvd.sys", manufacturer: "Intel", category: DriverCategory::Storage, known_issues: "vmd controller timeouts", stop_codes: STORAGE_CODES, remediation: STORAGE_FIX },
    DriverInfo { name: "amdsata.sys", manufacturer: "AMD", category: DriverCategory::Storage, known_issues: "sata controller timeouts", stop_codes: STORAGE_CODES, remediation: STORAGE_FIX },
    DriverInfo { name: "rtkvhd64.sys", manufacturer: "Realtek", category: DriverCategory::Audio, known_issues: "audio driver power state failures", stop_codes: &[0x9F, 0xD1, 0x0A, 0x133], remediation: "install the audio driver from the motherboard or laptop vendor" },
    DriverInfo { name: "aswsp.sys", manufacturer: "Avast", category: DriverCategory::Antivirus, known_issues: "self protection driver conflicts", stop_codes: AV_CODES, remediation: AV_FIX },
    DriverInfo { name: "aswarpot.sys", manufacturer: "Avast", category: DriverCategory::Antivirus, known_issues: "anti-rootkit driver conflicts", stop_codes: AV_CODES, remediation: AV_FIX },
    DriverInfo { name: "klif.sys", manufacturer: "Kaspersky", category: DriverCategory::Antivirus, known_issues: "file system filter conflicts", stop_codes: AV_CODES, remediation: AV_FIX },
    DriverInfo { name: "mbamswissarmy.sys", manufacturer: "Malwarebytes", category: DriverCategory::Antivirus, known_issues: "protection driver conflicts", stop_codes: AV_CODES, remediation: AV_FIX },
    DriverInfo { name: "epfwwfp.sys", manufacturer: "ESET", category: DriverCategory::Antivirus, known_issues: "firewall callout faults", stop_codes: AV_CODES, remediation: AV_FIX },
    DriverInfo { name: "ehdrv.sys", manufacturer: "ESET", category: DriverCategory::Antivirus, known_issues: "host intrusion prevention conflicts", stop_codes: AV_CODES, remediation: AV_FIX },
    DriverInfo { name: "bdselfpr.sys", manufacturer: "Bitdefender", category: DriverCategory::Antivirus, known_issues: "self protection driver conflicts", stop_codes: AV_CODES, remediation: AV_FIX },
    DriverInfo { name: "mfehidk.sys", manufacturer: "McAfee", category: DriverCategory::Antivirus, known_issues: "host intrusion driver conflicts", stop_codes: AV_CODES, remediation: AV_FIX },
    DriverInfo { name: "vgk.sys", manufacturer: "Riot Games", category: DriverCategory::AntiCheat, known_issues: "conflicts with monitoring tools and outdated windows builds", stop_codes: ANTICHEAT_CODES, remediation: ANTICHEAT_FIX },
    DriverInfo { name: "easyanticheat.sys", manufacturer: "Epic Games", category: DriverCategory::AntiCheat, known_issues: "faults with overlay and tuning software", stop_codes: ANTICHEAT_CODES, remediation: ANTICHEAT_FIX },
    DriverInfo { name: "easyanticheat_eos.sys", manufacturer: "Epic Games", category: DriverCategory::AntiCheat, known_issues: "faults with overlay and tuning software", stop_codes: ANTICHEAT_CODES, remediation: ANTICHEAT_FIX },
    DriverInfo { name: "bedaisy.sys", manufacturer: "BattlEye", category: DriverCategory::AntiCheat, known_issues: "faults with overlay and tuning software", stop_codes: ANTICHEAT_CODES, remediation: ANTICHEAT_FIX },
    DriverInfo { name: "vboxdrv.sys", manufacturer: "Oracle", category: DriverCategory::Virtualization, known_issues: "conflicts with hyper-v and virtualization based security", stop_codes: &[0x3B, 0x50, 0x7E, 0x1E, 0x109, 0x139], remediation: "update VirtualBox or disable hyper-v features it conflicts with" },
    DriverInfo { name: "vmx86.sys", manufacturer: "VMware", category: DriverCategory::Virtualization, known_issues: "conflicts with hyper-v and virtualization based security", stop_codes: &[0x3B, 0x50, 0x7E, 0x1E, 0x109], remediation: "update VMware Workstation" },
    DriverInfo { name: "asio.sys", manufacturer: "ASUS", category: DriverCategory::HardwareMonitor, known_issues: "raw port and msr access from tuning utilities", stop_codes: LOWLEVEL_CODES, remediation: LOWLEVEL_FIX },
    DriverInfo { name: "asio3.sys", manufacturer: "ASUS", category: DriverCategory::HardwareMonitor, known_issues: "raw port and msr access from tuning utilities", stop_codes: LOWLEVEL_CODES, remediation: LOWLEVEL_FIX },
    DriverInfo { name: "glckio2.sys", manufacturer: "ASUS", category: DriverCategory::HardwareMonitor, known_issues: "raw port access from lighting utilities", stop_codes: LOWLEVEL_CODES, remediation: LOWLEVEL_FIX },
    DriverInfo { name: "rtcore64.sys", manufacturer: "MSI", category: DriverCategory::HardwareMonitor, known_issues: "raw memory access from afterburner", stop_codes: LOWLEVEL_CODES, remediation: LOWLEVEL_FIX },
    DriverInfo { name: "winring0x64.sys", manufacturer: "OpenLibSys", category: DriverCategory::HardwareMonitor, known_issues: "raw msr and port access shared by many fan control tools", stop_codes: LOWLEVEL_CODES, remediation: LOWLEVEL_FIX },
    DriverInfo { name: "hwinfo64a.sys", manufacturer: "REALiX", category: DriverCategory::HardwareMonitor, known_issues: "sensor polling faults on new platforms", stop_codes: LOWLEVEL_CODES, remediation: "update HWiNFO or stop it while testing" },
    DriverInfo { name: "dtsoftbus01.sys", manufacturer: "Disc Soft", category: DriverCategory::DiscEmulation, known_issues: "virtual bus driver faults", stop_codes: &[0x3B, 0x7E, 0xD1, 0x9F], remediation: "uninstall DAEMON Tools" },
    DriverInfo { name: "sptd.sys", manufacturer: "Duplex Secure", category: DriverCategory::DiscEmulation, known_issues: "legacy pass-through driver incompatible with current windows", stop_codes: &[0x7B, 0x7E, 0x3B, 0xD1], remediation: "remove SPTD with its uninstaller" },
    DriverInfo { name: "lgbusenum.sys", manufacturer: "Logitech", category: DriverCategory::Peripheral, known_issues: "gaming software virtual bus faults", stop_codes: &[0x3B, 0x7E, 0x9F], remediation: "update or remove Logitech Gaming Software" },
    DriverInfo { name: "rzudd.sys", manufacturer: "Razer", category: DriverCategory::Peripheral, known_issues: "synapse filter driver faults", stop_codes: &[0x3B, 0x7E, 0x9F], remediation: "update Razer Synapse" },
    DriverInfo { name: "npf.sys", manufacturer: "WinPcap", category: DriverCategory::Network, known_issues: "unmaintained packet capture driver", stop_codes: NET_CODES, remediation: "replace WinPcap with Npcap" },
];

/// Looks up a driver by file name, case-insensitive.
pub fn lookup(name: &str) -> Option<&'static DriverInfo> {
    let lower = name.to_lowercase();
    CATALOG.iter().find(|d| d.name == lower)
}

pub fn catalog() -> &'static [DriverInfo] {
    CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_lowercase_and_unique() {
        let mut seen = HashSet::new();
        for d in CATALOG {
            assert_eq!(d.name, d.name.to_lowercase());
            assert!(seen.insert(d.name), "duplicate entry {}", d.name);
        }
        assert!(catalog().len() >= 40);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let info = lookup("NVLDDMKM.SYS").unwrap();
        assert_eq!(info.manufacturer, "NVIDIA");
        assert_eq!(info.category, DriverCategory::Graphics);
        assert!(info.is_associated_with(0x116));
        assert!(!info.is_associated_with(0x124));
        assert!(lookup("ndis.sys").is_none());
    }
}
