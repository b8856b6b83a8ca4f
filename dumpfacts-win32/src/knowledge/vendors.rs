/*!
Vendor attribution for module names.

Module names are matched by lowercase file stem. Microsoft inbox modules are
listed explicitly so that everything else can be treated as third party.
*/

/// Modules that appear in nearly every crash because they dispatch the fault,
/// not because they caused it.
const CARRIERS: &[&str] = &[
    "ntoskrnl", "ntkrnlmp", "ntkrnlpa", "ntkrpamp", "hal", "win32k", "win32kbase", "win32kfull",
    "dxgkrnl", "dxgmms1", "dxgmms2",
];

#[rustfmt::skip]
const MICROSOFT: &[&str] = &[
    "acpi", "afd", "ahcache", "bam", "basicdisplay", "basicrender", "beep", "bowser", "cdd",
    "cdrom", "ci", "classpnp", "clfs", "cng", "compositebus", "condrv", "crashdmp", "csc",
    "disk", "dumpata", "dumpfve", "dxgkrnl", "dxgmms1", "dxgmms2", "fltmgr", "fvevol", "fwpkclnt",
    "hal", "hdaudbus", "hdaudio", "hidclass", "hidparse", "hidusb", "http", "iorate", "kbdclass",
    "kbdhid", "kdcom", "ks", "ksecdd", "ksecpkg", "luafv", "mountmgr", "mouclass", "mouhid",
    "mpsdrv", "mrxsmb", "mrxsmb20", "msfs", "msisadrv", "mslldp", "mup", "ndis", "ndiswan",
    "ndu", "netbios", "netbt", "netio", "npfs", "npsvctrig", "nsiproxy", "ntfs", "ntkrnlmp",
    "ntkrnlpa", "ntkrpamp", "ntoskrnl", "null", "partmgr", "pci", "pciidex", "pcw", "pdc", "peauth",
    "portcls", "rassstp", "rdbss", "rdyboost", "refs", "rspndr", "spaceport", "srv2", "srvnet",
    "storahci", "stornvme", "storport", "tcpip", "tdi", "tdx", "tm", "tpm", "ucx01000", "umbus",
    "usbccgp", "usbhub3", "usbxhci", "vdrvroot", "vmbus", "volmgr", "volmgrx", "volsnap",
    "volume", "wcifs", "wdf01000", "wdfldr", "wfplwfs", "win32k", "win32kbase", "win32kfull",
    "winhvr", "wmilib", "wof", "wpprecorder", "ws2ifsl", "wtd",
    // user mode
    "advapi32", "combase", "gdi32", "gdi32full", "kernel32", "kernelbase", "msvcp_win",
    "msvcrt", "ntdll", "ole32", "rpcrt4", "sechost", "shell32", "ucrtbase", "user32",
    "win32u", "ws2_32", "d3d11", "d3d12", "dxgi", "dwmcore", "windows.storage",
];

/// Lowercase name prefixes that identify a hardware or software vendor.
#[rustfmt::skip]
const PREFIXES: &[(&str, &str)] = &[
    ("nvlddmkm", "NVIDIA"), ("nvhda", "NVIDIA"), ("nvvad", "NVIDIA"), ("nvvhci", "NVIDIA"), ("nv", "NVIDIA"),
    ("atikm", "AMD"), ("amdk", "AMD"), ("amdsata", "AMD"), ("amdppm", "AMD"), ("amdpsp", "AMD"), ("amd", "AMD"), ("ati", "AMD"),
    ("igdkmd", "Intel"), ("iastor", "Intel"), ("netwtw", "Intel"), ("netwbw", "Intel"), ("e1i", "Intel"),
    ("e1d", "Intel"), ("e1r", "Intel"), ("iqvw", "Intel"), ("teedriver", "Intel"), ("intel", "Intel"),
    ("rt640", "Realtek"), ("rtwlan", "Realtek"), ("rtkvhd", "Realtek"), ("rtux", "Realtek"), ("rtk", "Realtek"),
    ("bcm", "Broadcom"), ("b57nd", "Broadcom"),
    ("qcamain", "Qualcomm"), ("athw", "Qualcomm"),
    ("killer", "Rivet Networks"),
    ("asw", "Avast"), ("aswsp", "Avast"),
    ("avg", "AVG"),
    ("kl", "Kaspersky"),
    ("mbam", "Malwarebytes"),
    ("eamon", "ESET"), ("ehdrv", "ESET"), ("epfw", "ESET"),
    ("bd", "Bitdefender"), ("avc3", "Bitdefender"),
    ("mfe", "McAfee"),
    ("symefa", "Norton"), ("srtsp", "Norton"),
    ("vgk", "Riot Games"),
    ("easyanticheat", "Epic Games"),
    ("bedaisy", "BattlEye"),
    ("vbox", "Oracle"),
    ("vmx86", "VMware"), ("vmci", "VMware"), ("vmnet", "VMware"), ("vmusb", "VMware"),
    ("asio", "ASUS"), ("glckio", "ASUS"), ("atkwmi", "ASUS"),
    ("rtcore", "MSI"),
    ("winring0", "OpenLibSys"),
    ("hwinfo", "REALiX"),
    ("dtsoftbus", "Disc Soft"),
    ("sptd", "Duplex Secure"),
    ("lg", "Logitech"),
    ("rz", "Razer"),
    ("corsair", "Corsair"),
    ("npf", "WinPcap"), ("npcap", "Nmap"),
];

fn stem(name: &str) -> String {
    let file = name.rsplit(|c| c == '\\' || c == '/').next().unwrap_or(name);
    let lower = file.to_lowercase();
    match lower.rfind('.') {
        Some(i) if i > 0 => lower[..i].to_string(),
        _ => lower,
    }
}

/// Returns true for kernel modules that carry most faults regardless of the cause.
pub fn is_carrier(name: &str) -> bool {
    let stem = stem(name);
    CARRIERS.contains(&stem.as_str())
}

pub fn is_microsoft(name: &str) -> bool {
    let stem = stem(name);
    MICROSOFT.contains(&stem.as_str())
}

pub fn is_third_party(name: &str) -> bool {
    !is_microsoft(name)
}

/// Attributes a module to a vendor by its name. The longest matching prefix wins.
pub fn vendor(name: &str) -> Option<&'static str> {
    let stem = stem(name);
    if MICROSOFT.contains(&stem.as_str()) {
        return Some("Microsoft");
    }
    PREFIXES
        .iter()
        .filter(|(prefix, _)| stem.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, vendor)| *vendor)
}
