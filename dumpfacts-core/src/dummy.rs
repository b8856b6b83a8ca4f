/*!
Synthetic dump builders and byte mutators.

Used by the unit tests of this crate, the integration tests of the analysis pipeline and for
randomized truncation testing. Enabled with the `dummy_dump` feature.
*/

use rand::{thread_rng, Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::context::{Amd64Registers, RegisterState};
use crate::kernel::{offsets as kernel_offsets, triage, DUMP_HEADER64_SIZE};
use crate::minidump::stream_type;
use crate::types::arch::{machine, processor};
use crate::types::exception::EXCEPTION_MAXIMUM_PARAMETERS;
use crate::types::Architecture;

fn put(buf: &mut [u8], at: u64, bytes: &[u8]) {
    let at = at as usize;
    buf[at..at + bytes.len()].copy_from_slice(bytes);
}

fn encode_exception_record(code: u32, flags: u32, address: u64, info: &[u64]) -> Vec<u8> {
    let mut record = vec![0u8; 0x98];
    put(&mut record, 0x0, &code.to_le_bytes());
    put(&mut record, 0x4, &flags.to_le_bytes());
    put(&mut record, 0x10, &address.to_le_bytes());
    let count = info.len().min(EXCEPTION_MAXIMUM_PARAMETERS);
    put(&mut record, 0x18, &(count as u32).to_le_bytes());
    for (i, value) in info.iter().take(count).enumerate() {
        put(&mut record, 0x20 + i as u64 * 8, &value.to_le_bytes());
    }
    record
}

fn encode_context(state: &RegisterState) -> Vec<u8> {
    match state {
        RegisterState::Amd64(regs) => regs.encode(),
        RegisterState::X86(regs) => regs.encode(),
    }
}

#[derive(Debug, Clone)]
struct DummyException {
    code: u32,
    flags: u32,
    address: u64,
    info: Vec<u64>,
}

/// Builds `PAGEDU64` kernel dumps.
///
/// Unused header bytes are filled with the `PAGE` pattern like the kernel does.
#[derive(Debug, Clone)]
pub struct KernelDumpBuilder {
    machine: u32,
    build_number: u32,
    processors: u32,
    bug_check_code: u32,
    bug_check_parameters: [u64; 4],
    dump_type: Option<u32>,
    comment: Option<String>,
    context: Option<Amd64Registers>,
    exception: Option<DummyException>,
    drivers: Vec<(String, u64, u32)>,
}

impl Default for KernelDumpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelDumpBuilder {
    pub fn new() -> Self {
        Self {
            machine: machine::AMD64,
            build_number: 19041,
            processors: 8,
            bug_check_code: 0,
            bug_check_parameters: [0; 4],
            dump_type: None,
            comment: None,
            context: None,
            exception: None,
            drivers: vec![],
        }
    }

    pub fn bug_check(mut self, code: u32, parameters: [u64; 4]) -> Self {
        self.bug_check_code = code;
        self.bug_check_parameters = parameters;
        self
    }

    pub fn machine(mut self, machine: u32) -> Self {
        self.machine = machine;
        self
    }

    pub fn build_number(mut self, build_number: u32) -> Self {
        self.build_number = build_number;
        self
    }

    /// Overrides the dump type. Defaults to a triage dump if drivers were added and to a full
    /// dump otherwise.
    pub fn dump_type(mut self, dump_type: u32) -> Self {
        self.dump_type = Some(dump_type);
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn context(mut self, context: Amd64Registers) -> Self {
        self.context = Some(context);
        self
    }

    pub fn exception(mut self, code: u32, address: u64, info: &[u64]) -> Self {
        self.exception = Some(DummyException {
            code,
            flags: 0,
            address,
            info: info.to_vec(),
        });
        self
    }

    /// Adds a driver table entry. `path` is stored as is.
    pub fn driver(mut self, path: &str, base: u64, size: u32) -> Self {
        self.drivers.push((path.to_string(), base, size));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = b"PAGE"
            .iter()
            .cycle()
            .take(DUMP_HEADER64_SIZE as usize)
            .copied()
            .collect::<Vec<u8>>();

        put(&mut buf, 0x0, b"PAGEDU64");
        put(&mut buf, 0x8, &0xfu32.to_le_bytes());
        put(&mut buf, 0xc, &self.build_number.to_le_bytes());
        put(&mut buf, 0x10, &0x1ad000u64.to_le_bytes());
        put(&mut buf, 0x18, &0xfffffa80_00000000u64.to_le_bytes());
        put(&mut buf, 0x20, &0xfffff803_1f2a0000u64.to_le_bytes());
        put(&mut buf, 0x28, &0xfffff803_1f2b0000u64.to_le_bytes());
        put(&mut buf, 0x30, &self.machine.to_le_bytes());
        put(&mut buf, 0x34, &self.processors.to_le_bytes());
        put(
            &mut buf,
            kernel_offsets::BUG_CHECK_CODE,
            &self.bug_check_code.to_le_bytes(),
        );
        put(&mut buf, 0x3c, &[0; 4]);
        for (i, p) in self.bug_check_parameters.iter().enumerate() {
            put(
                &mut buf,
                kernel_offsets::BUG_CHECK_PARAMETERS + i as u64 * 8,
                &p.to_le_bytes(),
            );
        }
        put(&mut buf, 0x80, &0xfffff803_1f400000u64.to_le_bytes());

        // no physical memory runs
        put(&mut buf, kernel_offsets::PHYSICAL_MEMORY_BLOCK, &[0; 0x210]);

        // context and exception record area
        put(
            &mut buf,
            kernel_offsets::CONTEXT_RECORD,
            &[0; (0xf98 - 0x348) as usize],
        );
        if let Some(context) = &self.context {
            put(&mut buf, kernel_offsets::CONTEXT_RECORD, &context.encode());
        }
        if let Some(e) = &self.exception {
            put(
                &mut buf,
                kernel_offsets::EXCEPTION_RECORD,
                &encode_exception_record(e.code, e.flags, e.address, &e.info),
            );
        }

        let dump_type = self
            .dump_type
            .unwrap_or(if self.drivers.is_empty() { 1 } else { 4 });
        put(&mut buf, kernel_offsets::DUMP_TYPE, &dump_type.to_le_bytes());
        put(&mut buf, 0xf9c, &[0; 0x14]);
        if let Some(comment) = &self.comment {
            let mut field = [0u8; 0x80];
            let len = comment.len().min(0x7f);
            field[..len].copy_from_slice(&comment.as_bytes()[..len]);
            put(&mut buf, kernel_offsets::COMMENT, &field);
        }
        put(&mut buf, kernel_offsets::SYSTEM_UP_TIME, &[0; 0x20]);
        put(&mut buf, kernel_offsets::PRODUCT_TYPE, &1u32.to_le_bytes());
        put(&mut buf, 0x1044, &0x100u32.to_le_bytes());

        if dump_type == 4 {
            self.write_triage(&mut buf);
        }
        buf
    }

    fn write_triage(&self, buf: &mut Vec<u8>) {
        let triage_base = triage::TRIAGE_HEADER_OFFSET;
        let list = triage_base + 0x100;
        let pool = list + self.drivers.len() as u64 * triage::DRIVER_ENTRY_SIZE;

        buf.resize(pool as usize, 0);
        let mut names = vec![];
        for (path, _, _) in self.drivers.iter() {
            while buf.len() % 8 != 0 {
                buf.push(0);
            }
            names.push(buf.len() as u32);
            let units = path.encode_utf16().collect::<Vec<_>>();
            buf.extend_from_slice(&(units.len() as u32).to_le_bytes());
            for u in units {
                buf.extend_from_slice(&u.to_le_bytes());
            }
            buf.extend_from_slice(&[0, 0]);
        }
        let total = buf.len() as u64;
        let pool_size = total - pool;

        let header = triage_base;
        put(buf, header, &0x1db1u32.to_le_bytes());
        put(buf, header + 0x4, &(total as u32).to_le_bytes());
        put(
            buf,
            header + triage::offsets::DRIVER_LIST_OFFSET,
            &(list as u32).to_le_bytes(),
        );
        put(
            buf,
            header + triage::offsets::DRIVER_COUNT,
            &(self.drivers.len() as u32).to_le_bytes(),
        );
        put(
            buf,
            header + triage::offsets::STRING_POOL_OFFSET,
            &(pool as u32).to_le_bytes(),
        );
        put(
            buf,
            header + triage::offsets::STRING_POOL_SIZE,
            &(pool_size as u32).to_le_bytes(),
        );

        for (i, ((_, base, size), name)) in self.drivers.iter().zip(names).enumerate() {
            let entry = list + i as u64 * triage::DRIVER_ENTRY_SIZE;
            put(
                buf,
                entry + triage::entry_offsets::DRIVER_NAME_OFFSET,
                &name.to_le_bytes(),
            );
            put(
                buf,
                entry + triage::entry_offsets::DLL_BASE,
                &base.to_le_bytes(),
            );
            put(
                buf,
                entry + triage::entry_offsets::SIZE_OF_IMAGE,
                &size.to_le_bytes(),
            );
        }
    }
}

#[derive(Debug, Clone)]
struct DummyThread {
    thread_id: u32,
    stack_start: u64,
    stack: Vec<u8>,
    context: Option<RegisterState>,
}

/// Builds `MDMP` minidumps.
///
/// Streams are laid out after the header, the stream directory is written last.
#[derive(Debug, Clone)]
pub struct MinidumpBuilder {
    architecture: Option<u16>,
    version: (u32, u32, u32),
    modules: Vec<(String, u64, u32, Option<String>)>,
    unloaded: Vec<(String, u64, u32)>,
    exception_thread: u32,
    exception: Option<DummyException>,
    exception_context: Option<RegisterState>,
    threads: Vec<DummyThread>,
    memory: Vec<(u64, Vec<u8>)>,
    process_id: Option<u32>,
}

impl Default for MinidumpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MinidumpBuilder {
    pub fn new() -> Self {
        Self {
            architecture: Some(processor::AMD64),
            version: (10, 0, 19045),
            modules: vec![],
            unloaded: vec![],
            exception_thread: 1,
            exception: None,
            exception_context: None,
            threads: vec![],
            memory: vec![],
            process_id: None,
        }
    }

    /// Sets the system info architecture, `None` omits the system info stream.
    pub fn architecture(mut self, arch: Option<Architecture>) -> Self {
        self.architecture = arch.map(|arch| match arch {
            Architecture::Amd64 => processor::AMD64,
            Architecture::X86 => processor::INTEL,
            Architecture::Arm64 => processor::ARM64,
            Architecture::Arm => processor::ARM,
            Architecture::Unknown(v) => v as u16,
        });
        self
    }

    pub fn version(mut self, major: u32, minor: u32, build: u32) -> Self {
        self.version = (major, minor, build);
        self
    }

    pub fn module(mut self, path: &str, base: u64, size: u32) -> Self {
        self.modules.push((path.to_string(), base, size, None));
        self
    }

    /// Adds a module with an `RSDS` CodeView record.
    pub fn module_with_pdb(mut self, path: &str, base: u64, size: u32, pdb: &str) -> Self {
        self.modules
            .push((path.to_string(), base, size, Some(pdb.to_string())));
        self
    }

    pub fn unloaded_module(mut self, path: &str, base: u64, size: u32) -> Self {
        self.unloaded.push((path.to_string(), base, size));
        self
    }

    pub fn exception(mut self, thread_id: u32, code: u32, address: u64, info: &[u64]) -> Self {
        self.exception_thread = thread_id;
        self.exception = Some(DummyException {
            code,
            flags: 0,
            address,
            info: info.to_vec(),
        });
        self
    }

    pub fn exception_context(mut self, context: RegisterState) -> Self {
        self.exception_context = Some(context);
        self
    }

    pub fn thread(
        mut self,
        thread_id: u32,
        stack_start: u64,
        stack: Vec<u8>,
        context: Option<RegisterState>,
    ) -> Self {
        self.threads.push(DummyThread {
            thread_id,
            stack_start,
            stack,
            context,
        });
        self
    }

    pub fn memory(mut self, start: u64, bytes: Vec<u8>) -> Self {
        self.memory.push((start, bytes));
        self
    }

    pub fn process_id(mut self, pid: u32) -> Self {
        self.process_id = Some(pid);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut w = StreamWriter::new();

        if let Some(arch) = self.architecture {
            let mut info = vec![0u8; 0x38];
            put(&mut info, 0x0, &arch.to_le_bytes());
            put(&mut info, 0x2, &6u16.to_le_bytes());
            put(&mut info, 0x4, &0x9e0au16.to_le_bytes());
            info[0x6] = 8;
            info[0x7] = 1;
            put(&mut info, 0x8, &self.version.0.to_le_bytes());
            put(&mut info, 0xc, &self.version.1.to_le_bytes());
            put(&mut info, 0x10, &self.version.2.to_le_bytes());
            put(&mut info, 0x14, &2u32.to_le_bytes());
            let csd = w.append_string("");
            put(&mut info, 0x18, &csd.to_le_bytes());
            put(&mut info, 0x20, b"GenuineIntel");
            w.add_stream(stream_type::SYSTEM_INFO, &info);
        }

        if !self.modules.is_empty() {
            let mut list = (self.modules.len() as u32).to_le_bytes().to_vec();
            for (path, base, size, pdb) in self.modules.iter() {
                let name = w.append_string(path);
                let mut entry = vec![0u8; 108];
                put(&mut entry, 0x0, &base.to_le_bytes());
                put(&mut entry, 0x8, &size.to_le_bytes());
                put(&mut entry, 0x10, &0x5f5e_1000u32.to_le_bytes());
                put(&mut entry, 0x14, &name.to_le_bytes());
                if let Some(pdb) = pdb {
                    let mut cv = b"RSDS".to_vec();
                    cv.extend((0..16).map(|i| (i * 0x11) as u8));
                    cv.extend_from_slice(&1u32.to_le_bytes());
                    cv.extend_from_slice(pdb.as_bytes());
                    cv.push(0);
                    let rva = w.append(&cv);
                    put(&mut entry, 0x4c, &(cv.len() as u32).to_le_bytes());
                    put(&mut entry, 0x50, &rva.to_le_bytes());
                }
                list.extend_from_slice(&entry);
            }
            w.add_stream(stream_type::MODULE_LIST, &list);
        }

        if !self.unloaded.is_empty() {
            let mut list = vec![];
            list.extend_from_slice(&12u32.to_le_bytes());
            list.extend_from_slice(&24u32.to_le_bytes());
            list.extend_from_slice(&(self.unloaded.len() as u32).to_le_bytes());
            for (path, base, size) in self.unloaded.iter() {
                let name = w.append_string(path);
                list.extend_from_slice(&base.to_le_bytes());
                list.extend_from_slice(&size.to_le_bytes());
                list.extend_from_slice(&0u32.to_le_bytes());
                list.extend_from_slice(&0u32.to_le_bytes());
                list.extend_from_slice(&name.to_le_bytes());
            }
            w.add_stream(stream_type::UNLOADED_MODULE_LIST, &list);
        }

        if !self.threads.is_empty() {
            let mut list = (self.threads.len() as u32).to_le_bytes().to_vec();
            for thread in self.threads.iter() {
                let stack_rva = w.append(&thread.stack);
                let (ctx_size, ctx_rva) = match &thread.context {
                    Some(ctx) => {
                        let bytes = encode_context(ctx);
                        (bytes.len() as u32, w.append(&bytes))
                    }
                    None => (0, 0),
                };
                list.extend_from_slice(&thread.thread_id.to_le_bytes());
                list.extend_from_slice(&[0; 12]);
                list.extend_from_slice(&0x7ff_f000u64.to_le_bytes());
                list.extend_from_slice(&thread.stack_start.to_le_bytes());
                list.extend_from_slice(&(thread.stack.len() as u32).to_le_bytes());
                list.extend_from_slice(&stack_rva.to_le_bytes());
                list.extend_from_slice(&ctx_size.to_le_bytes());
                list.extend_from_slice(&ctx_rva.to_le_bytes());
            }
            w.add_stream(stream_type::THREAD_LIST, &list);
        }

        if !self.memory.is_empty() {
            let mut list = (self.memory.len() as u32).to_le_bytes().to_vec();
            for (start, bytes) in self.memory.iter() {
                let rva = w.append(bytes);
                list.extend_from_slice(&start.to_le_bytes());
                list.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                list.extend_from_slice(&rva.to_le_bytes());
            }
            w.add_stream(stream_type::MEMORY_LIST, &list);
        }

        if let Some(e) = &self.exception {
            let (ctx_size, ctx_rva) = match &self.exception_context {
                Some(ctx) => {
                    let bytes = encode_context(ctx);
                    (bytes.len() as u32, w.append(&bytes))
                }
                None => (0, 0),
            };
            let mut stream = vec![0u8; 0xa8];
            put(&mut stream, 0x0, &self.exception_thread.to_le_bytes());
            put(
                &mut stream,
                0x8,
                &encode_exception_record(e.code, e.flags, e.address, &e.info),
            );
            put(&mut stream, 0xa0, &ctx_size.to_le_bytes());
            put(&mut stream, 0xa4, &ctx_rva.to_le_bytes());
            w.add_stream(stream_type::EXCEPTION, &stream);
        }

        if let Some(pid) = self.process_id {
            let mut misc = vec![0u8; 0x18];
            put(&mut misc, 0x0, &0x18u32.to_le_bytes());
            put(&mut misc, 0x4, &1u32.to_le_bytes());
            put(&mut misc, 0x8, &pid.to_le_bytes());
            w.add_stream(stream_type::MISC_INFO, &misc);
        }

        w.finish()
    }
}

struct StreamWriter {
    buf: Vec<u8>,
    directory: Vec<(u32, u32, u32)>,
}

impl StreamWriter {
    fn new() -> Self {
        Self {
            buf: vec![0u8; 0x20],
            directory: vec![],
        }
    }

    fn append(&mut self, bytes: &[u8]) -> u32 {
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
        let rva = self.buf.len() as u32;
        self.buf.extend_from_slice(bytes);
        rva
    }

    fn append_string(&mut self, s: &str) -> u32 {
        let units = s.encode_utf16().collect::<Vec<_>>();
        let mut bytes = (units.len() as u32 * 2).to_le_bytes().to_vec();
        for u in units {
            bytes.extend_from_slice(&u.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0]);
        self.append(&bytes)
    }

    fn add_stream(&mut self, stream_type: u32, bytes: &[u8]) {
        let rva = self.append(bytes);
        self.directory.push((stream_type, bytes.len() as u32, rva));
    }

    fn finish(mut self) -> Vec<u8> {
        let mut directory = vec![];
        for (ty, size, rva) in self.directory.iter() {
            directory.extend_from_slice(&ty.to_le_bytes());
            directory.extend_from_slice(&size.to_le_bytes());
            directory.extend_from_slice(&rva.to_le_bytes());
        }
        let directory_rva = self.append(&directory);

        let count = self.directory.len() as u32;
        put(&mut self.buf, 0x0, b"MDMP");
        put(&mut self.buf, 0x4, &0xa793u32.to_le_bytes());
        put(&mut self.buf, 0x8, &count.to_le_bytes());
        put(&mut self.buf, 0xc, &directory_rva.to_le_bytes());
        put(&mut self.buf, 0x14, &0x6400_0000u32.to_le_bytes());
        self.buf
    }
}

/// Produces damaged variants of a valid dump.
pub struct DumpMutator {
    rng: XorShiftRng,
}

impl Default for DumpMutator {
    fn default() -> Self {
        Self::new()
    }
}

impl DumpMutator {
    pub fn new() -> Self {
        Self::with_seed(thread_rng().gen())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }

    /// Cuts the buffer at a random length.
    pub fn truncate(&mut self, bytes: &[u8]) -> Vec<u8> {
        let len = self.rng.gen_range(0, bytes.len() + 1);
        bytes[..len].to_vec()
    }

    /// Overwrites `count` random bytes past the leading signature.
    pub fn corrupt(&mut self, bytes: &[u8], count: usize) -> Vec<u8> {
        let mut out = bytes.to_vec();
        if out.len() <= 8 {
            return out;
        }
        for _ in 0..count {
            let at = self.rng.gen_range(8, out.len());
            out[at] = self.rng.gen();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Format, ParsedDump, RawDump};

    #[test]
    fn kernel_builder_roundtrip() {
        let bytes = KernelDumpBuilder::new()
            .bug_check(0xa, [0x10, 2, 0, 0xfffff801_12345678])
            .driver("\\SystemRoot\\system32\\ntoskrnl.exe", 0xfffff801_00000000, 0x100_0000)
            .build();
        let dump = RawDump::new(bytes);
        assert_eq!(dump.format(), Format::Kernel64);
        match dump.parse().unwrap() {
            ParsedDump::Kernel(kernel) => {
                assert_eq!(kernel.bug_check_code(), 0xa);
                assert_eq!(kernel.modules().unwrap()[0].name, "ntoskrnl.exe");
                assert_eq!(kernel.header().comment, None);
            }
            _ => panic!("expected a kernel dump"),
        }
    }

    #[test]
    fn minidump_builder_roundtrip() {
        let bytes = MinidumpBuilder::new()
            .module("C:\\drv\\a.sys", 0x1000, 0x2000)
            .exception(7, 0xC000_0005, 0x1500, &[0, 0])
            .process_id(99)
            .build();
        let dump = RawDump::new(bytes);
        match dump.parse().unwrap() {
            ParsedDump::Minidump(mini) => {
                assert_eq!(mini.modules().unwrap()[0].name, "a.sys");
                assert_eq!(mini.exception().unwrap().thread_id, 7);
                assert_eq!(mini.misc_info().unwrap().process_id, Some(99));
                assert_eq!(mini.architecture(), Architecture::Amd64);
            }
            _ => panic!("expected a minidump"),
        }
    }

    #[test]
    fn mutator_is_deterministic() {
        let bytes = MinidumpBuilder::new().build();
        let a = DumpMutator::with_seed(7).truncate(&bytes);
        let b = DumpMutator::with_seed(7).truncate(&bytes);
        assert_eq!(a, b);
        assert!(a.len() <= bytes.len());
    }
}
