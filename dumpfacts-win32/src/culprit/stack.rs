use std::collections::BTreeMap;
use std::convert::TryInto;

use log::trace;

use dumpfacts_core::types::module::find_module;
use dumpfacts_core::Module;

/// Counts pointer sized values in a stack window that point into a loaded module.
///
/// Keys are lowercase module names. Modules with zero size never match.
pub fn stack_hits(window: &[u8], pointer_width: u64, modules: &[Module]) -> BTreeMap<String, u32> {
    let mut hits = BTreeMap::new();
    let width = match pointer_width {
        4 | 8 => pointer_width as usize,
        _ => return hits,
    };

    for chunk in window.chunks_exact(width) {
        let value = if width == 8 {
            chunk.try_into().map(u64::from_le_bytes).unwrap_or(0)
        } else {
            chunk
                .try_into()
                .map(|b| u64::from(u32::from_le_bytes(b)))
                .unwrap_or(0)
        };
        if value == 0 {
            continue;
        }
        if let Some(module) = find_module(modules, value) {
            *hits.entry(module.name.to_lowercase()).or_insert(0) += 1;
        }
    }

    trace!("stack scan hits: {:?}", hits);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use dumpfacts_core::ModuleOrigin;

    #[test]
    fn counts_pointers_into_modules() {
        let modules = vec![
            Module::new("a.sys", 0x1000, 0x1000, ModuleOrigin::DriverTable),
            Module::new("B.sys", 0x4000, 0x1000, ModuleOrigin::DriverTable),
        ];
        let mut window = vec![];
        for value in &[0x1010u64, 0x4fff, 0x5000, 0, 0x1ff0, 0x1234_5678] {
            window.extend_from_slice(&value.to_le_bytes());
        }
        // trailing partial pointer is ignored
        window.extend_from_slice(&[0x10, 0x10]);

        let hits = stack_hits(&window, 8, &modules);
        assert_eq!(hits.get("a.sys"), Some(&2));
        assert_eq!(hits.get("b.sys"), Some(&1));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn x86_window() {
        let modules = vec![Module::new("app.exe", 0x40_0000, 0x1000, ModuleOrigin::ModuleList)];
        let mut window = vec![];
        for value in &[0x40_0010u32, 0x40_0020, 0x7fff_0000] {
            window.extend_from_slice(&value.to_le_bytes());
        }
        assert_eq!(stack_hits(&window, 4, &modules).get("app.exe"), Some(&2));
        assert!(stack_hits(&window, 3, &modules).is_empty());
    }
}
