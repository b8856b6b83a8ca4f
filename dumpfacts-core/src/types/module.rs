use std::collections::HashSet;
use std::fmt;

/// Where a module entry was taken from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub enum ModuleOrigin {
    /// Minidump module list stream.
    ModuleList,
    /// Minidump unloaded module list stream.
    UnloadedModuleList,
    /// Driver table of a kernel triage dump.
    DriverTable,
    /// Name found by scanning raw bytes. Base and size are unknown.
    TextScan,
}

impl ModuleOrigin {
    /// Returns true for origins decoded from a structured table.
    pub fn is_structured(self) -> bool {
        !matches!(self, ModuleOrigin::TextScan)
    }
}

/// PDB reference taken from a module's CodeView (`RSDS`) record.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct CodeViewInfo {
    pub pdb_name: String,
    pub guid: [u8; 16],
    pub age: u32,
}

impl CodeViewInfo {
    /// Formats the GUID + age the way symbol servers index pdb files.
    pub fn symbol_store_id(&self) -> String {
        let g = &self.guid;
        let data1 = u32::from_le_bytes([g[0], g[1], g[2], g[3]]);
        let data2 = u16::from_le_bytes([g[4], g[5]]);
        let data3 = u16::from_le_bytes([g[6], g[7]]);
        let mut id = format!("{:08X}{:04X}{:04X}", data1, data2, data3);
        for b in &g[8..] {
            id.push_str(&format!("{:02X}", b));
        }
        id.push_str(&format!("{:X}", self.age));
        id
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct Module {
    /// File name, e.g. `ndis.sys`.
    pub name: String,
    /// Full path if the container stores one.
    pub path: Option<String>,
    pub base: u64,
    pub size: u64,
    pub checksum: u32,
    pub timestamp: u32,
    pub origin: ModuleOrigin,
    pub codeview: Option<CodeViewInfo>,
}

impl Module {
    pub fn new(name: &str, base: u64, size: u64, origin: ModuleOrigin) -> Self {
        Self {
            name: name.to_string(),
            path: None,
            base,
            size,
            checksum: 0,
            timestamp: 0,
            origin,
            codeview: None,
        }
    }

    /// Builds a module out of a full path, the name being the last path component.
    pub fn from_path(path: &str, base: u64, size: u64, origin: ModuleOrigin) -> Self {
        let mut module = Self::new(file_name(path), base, size, origin);
        if module.name != path {
            module.path = Some(path.to_string());
        }
        module
    }

    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size)
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.base <= addr && addr < self.end()
    }

    /// Offset of `addr` relative to the module base.
    pub fn rva(&self, addr: u64) -> Option<u64> {
        if self.contains(addr) {
            Some(addr - self.base)
        } else {
            None
        }
    }

    /// Module name without extension, lowercased.
    pub fn stem(&self) -> String {
        let lower = self.name.to_lowercase();
        match lower.rfind('.') {
            Some(idx) if idx > 0 => lower[..idx].to_string(),
            _ => lower,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [{:#x}..{:#x})",
            self.name,
            self.base,
            self.end()
        )
    }
}

/// Returns the last component of a windows or unix style path.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(|c| c == '\\' || c == '/');
    trimmed
        .rsplit(|c| c == '\\' || c == '/')
        .next()
        .unwrap_or(trimmed)
}

/// Removes duplicate modules by case-insensitive name, keeping the first occurrence.
pub fn dedup_modules(modules: Vec<Module>) -> Vec<Module> {
    let mut seen = HashSet::new();
    modules
        .into_iter()
        .filter(|m| seen.insert(m.name.to_lowercase()))
        .collect()
}

/// Finds the module that contains `addr`.
pub fn find_module(modules: &[Module], addr: u64) -> Option<&Module> {
    modules.iter().find(|m| m.contains(addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let m = Module::new("a.sys", 0x1000, 0x2000, ModuleOrigin::ModuleList);
        assert_eq!(m.end(), 0x3000);
        assert!(!m.contains(0xfff));
        assert!(m.contains(0x1000));
        assert!(m.contains(0x2fff));
        assert!(!m.contains(0x3000));
        assert_eq!(m.rva(0x1500), Some(0x500));
        assert_eq!(m.rva(0x3000), None);
    }

    #[test]
    fn end_saturates() {
        let m = Module::new("x.sys", u64::MAX - 4, 0x100, ModuleOrigin::DriverTable);
        assert_eq!(m.end(), u64::MAX);
    }

    #[test]
    fn path_handling() {
        assert_eq!(file_name("\\SystemRoot\\system32\\drivers\\ndis.sys"), "ndis.sys");
        assert_eq!(file_name("C:/tmp/app.exe"), "app.exe");
        assert_eq!(file_name("hal.dll"), "hal.dll");

        let m = Module::from_path(
            "\\SystemRoot\\system32\\ntoskrnl.exe",
            0,
            1,
            ModuleOrigin::DriverTable,
        );
        assert_eq!(m.name, "ntoskrnl.exe");
        assert_eq!(
            m.path.as_deref(),
            Some("\\SystemRoot\\system32\\ntoskrnl.exe")
        );
        assert_eq!(m.stem(), "ntoskrnl");
    }

    #[test]
    fn dedup_by_name() {
        let modules = vec![
            Module::new("ndis.sys", 0x1000, 0x10, ModuleOrigin::ModuleList),
            Module::new("NDIS.SYS", 0x2000, 0x10, ModuleOrigin::ModuleList),
            Module::new("tcpip.sys", 0x3000, 0x10, ModuleOrigin::ModuleList),
        ];
        let modules = dedup_modules(modules);
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].base, 0x1000);
        assert_eq!(find_module(&modules, 0x3005).unwrap().name, "tcpip.sys");
    }

    #[test]
    fn codeview_id() {
        let cv = CodeViewInfo {
            pdb_name: "ntkrnlmp.pdb".to_string(),
            guid: [
                0x78, 0x56, 0x34, 0x12, 0xbc, 0x9a, 0xf0, 0xde, 0x01, 0x02, 0x03, 0x04, 0x05,
                0x06, 0x07, 0x08,
            ],
            age: 1,
        };
        assert_eq!(
            cv.symbol_store_id(),
            "123456789ABCDEF001020304050607081"
        );
    }
}
