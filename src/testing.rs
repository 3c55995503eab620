//! Collaborator doubles for unit tests.
//!
//! - `MockSpace`: a sparse address space backed by boxed pages
//! - `MemFs`: an in-memory filesystem counting closes
//! - `TestHost`: console, keyboard and process lifecycle, with `exec`d
//!   children reporting their load status from real threads
//! - `Harness`: a kernel plus one user process to issue traps from

use std::cell::{Cell, UnsafeCell};
use std::collections::{BTreeMap, VecDeque};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::{PAGE_MASK, PAGE_SIZE, SYSCALL_WORDS, WORD_SIZE};
use crate::drivers::{Console, Keyboard};
use crate::fs::{File, FileSystem};
use crate::kernel::{Caller, Kernel};
use crate::mm::{AddressSpace, PageTableFlags, Translation, VirtAddr};
use crate::process::{Handshake, LoadReporter, Pid, ProcessHost};
use crate::syscall::SyscallNumber;
use crate::trap::{TrapFrame, TrapResult};

const USER_PAGE: PageTableFlags = PageTableFlags::PRESENT
    .union(PageTableFlags::WRITABLE)
    .union(PageTableFlags::USER);

type Page = UnsafeCell<[u8; PAGE_SIZE]>;

pub struct MockSpace {
    pages: BTreeMap<usize, (Box<Page>, PageTableFlags)>,
}

impl MockSpace {
    pub fn with_pages(bases: &[usize]) -> Self {
        let mut space = Self {
            pages: BTreeMap::new(),
        };
        for &base in bases {
            space.map(base, USER_PAGE);
        }
        space
    }

    pub fn map(&mut self, base: usize, flags: PageTableFlags) {
        assert_eq!(base & PAGE_MASK, 0, "page base must be aligned");
        self.pages
            .insert(base, (Box::new(UnsafeCell::new([0; PAGE_SIZE])), flags));
    }

    fn byte(&self, addr: usize) -> *mut u8 {
        let (page, _) = self
            .pages
            .get(&(addr & !PAGE_MASK))
            .expect("test touched an unmapped address");
        (page.get() as *mut u8).wrapping_add(addr & PAGE_MASK)
    }

    pub fn poke(&self, addr: VirtAddr, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            // SAFETY: the byte lies inside a live page owned by `self`
            unsafe { *self.byte(addr.as_usize() + i) = b };
        }
    }

    pub fn peek(&self, addr: VirtAddr, len: usize) -> Vec<u8> {
        // SAFETY: as in `poke`
        (0..len).map(|i| unsafe { *self.byte(addr.as_usize() + i) }).collect()
    }

    pub fn push_words(&self, addr: VirtAddr, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            self.poke(VirtAddr::new(addr.as_usize() + i * WORD_SIZE), &word.to_le_bytes());
        }
    }
}

impl AddressSpace for MockSpace {
    fn translate(&self, addr: VirtAddr) -> Option<Translation> {
        let (page, flags) = self.pages.get(&addr.align_down().as_usize())?;
        let kaddr = NonNull::new((page.get() as *mut u8).wrapping_add(addr.page_offset()))?;
        Some(Translation { kaddr, flags: *flags })
    }
}

#[derive(Clone, Default)]
pub struct MemFs {
    files: Arc<Mutex<BTreeMap<String, Arc<Mutex<Vec<u8>>>>>>,
    closes: Arc<AtomicUsize>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, path: &str, contents: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), Arc::new(Mutex::new(contents.to_vec())));
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct MemFile {
    data: Arc<Mutex<Vec<u8>>>,
    pos: usize,
    closes: Arc<AtomicUsize>,
}

impl File for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let data = self.data.lock().unwrap();
        let start = self.pos.min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n;
        n
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        let mut data = self.data.lock().unwrap();
        let start = self.pos.min(data.len());
        let n = buf.len().min(data.len() - start);
        data[start..start + n].copy_from_slice(&buf[..n]);
        self.pos += n;
        n
    }

    fn seek(&mut self, pos: u32) {
        self.pos = pos as usize;
    }

    fn tell(&self) -> u32 {
        self.pos as u32
    }

    fn length(&self) -> u32 {
        self.data.lock().unwrap().len() as u32
    }

    fn close(self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn create(&mut self, path: &str, initial_size: u32) -> bool {
        let mut files = self.files.lock().unwrap();
        if path.is_empty() || files.contains_key(path) {
            return false;
        }
        files.insert(
            path.to_string(),
            Arc::new(Mutex::new(vec![0; initial_size as usize])),
        );
        true
    }

    fn remove(&mut self, path: &str) -> bool {
        self.files.lock().unwrap().remove(path).is_some()
    }

    fn open(&mut self, path: &str) -> Option<MemFile> {
        let data = self.files.lock().unwrap().get(path)?.clone();
        Some(MemFile {
            data,
            pos: 0,
            closes: self.closes.clone(),
        })
    }
}

#[derive(Default)]
pub struct TestHost {
    console: Mutex<Vec<u8>>,
    console_writes: Mutex<Vec<usize>>,
    keyboard: Mutex<VecDeque<u8>>,
    programs: Mutex<Vec<String>>,
    processes: Mutex<BTreeMap<Pid, Arc<Handshake>>>,
    next_pid: AtomicI32,
    exited: Mutex<Vec<Pid>>,
    powered_off: AtomicBool,
    refuse_create: AtomicBool,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            next_pid: AtomicI32::new(100),
            ..Self::default()
        }
    }

    pub fn console_output(&self) -> String {
        String::from_utf8_lossy(&self.console.lock().unwrap()).into_owned()
    }

    /// Length of every `write_buffer` call, in order.
    pub fn console_writes(&self) -> Vec<usize> {
        self.console_writes.lock().unwrap().clone()
    }

    pub fn type_keys(&self, keys: &[u8]) {
        self.keyboard.lock().unwrap().extend(keys);
    }

    pub fn install_program(&self, name: &str) {
        self.programs.lock().unwrap().push(name.to_string());
    }

    pub fn refuse_create(&self, refuse: bool) {
        self.refuse_create.store(refuse, Ordering::SeqCst);
    }

    pub fn spawn_process(&self, pid: Pid) -> Arc<Handshake> {
        let handshake = Arc::new(Handshake::new());
        self.processes.lock().unwrap().insert(pid, handshake.clone());
        handshake
    }

    pub fn exited(&self) -> Vec<Pid> {
        self.exited.lock().unwrap().clone()
    }

    pub fn powered_off(&self) -> bool {
        self.powered_off.load(Ordering::SeqCst)
    }
}

impl Console for TestHost {
    fn write_buffer(&self, buf: &[u8]) {
        self.console.lock().unwrap().extend_from_slice(buf);
        self.console_writes.lock().unwrap().push(buf.len());
    }
}

impl Keyboard for TestHost {
    fn read_char(&self) -> u8 {
        self.keyboard.lock().unwrap().pop_front().unwrap_or(0)
    }
}

impl ProcessHost for TestHost {
    fn create_process(&self, parent: Pid, command_line: &str, load: LoadReporter) -> Option<Pid> {
        if self.refuse_create.load(Ordering::SeqCst) {
            return None;
        }
        let pid = Pid::new(self.next_pid.fetch_add(1, Ordering::SeqCst));
        let program = command_line.split_whitespace().next().unwrap_or("");
        let loadable = self.programs.lock().unwrap().iter().any(|p| p == program);

        self.spawn_process(pid);
        if let Some(parent) = self.lookup(parent) {
            parent.track_child(pid);
        }
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            load.report(loadable);
        });
        Some(pid)
    }

    fn wait_for_child(&self, parent: Pid, child: Pid) -> i32 {
        match self.lookup(parent) {
            Some(handshake) => handshake.wait_child(child, thread::yield_now).unwrap_or(-1),
            None => -1,
        }
    }

    fn lookup(&self, pid: Pid) -> Option<Arc<Handshake>> {
        self.processes.lock().unwrap().get(&pid).cloned()
    }

    fn exit_current(&self, pid: Pid) {
        self.processes.lock().unwrap().remove(&pid);
        self.exited.lock().unwrap().push(pid);
    }

    fn power_off(&self) {
        self.powered_off.store(true, Ordering::SeqCst);
    }

    fn yield_now(&self) {
        thread::yield_now();
    }
}

pub const STACK_PAGE: usize = 0xbfff_f000;
pub const DATA_PAGE: usize = 0x0804_8000;
const DATA_PAGES: usize = 8;

/// A kernel with one user process ("test", pid 10) to trap from.
pub struct Harness {
    pub kernel: Kernel<MemFs, TestHost>,
    pub fs: MemFs,
    pub space: MockSpace,
    pub pid: Pid,
    pub handshake: Arc<Handshake>,
    next_free: Cell<usize>,
}

/// Another process issuing traps against the same kernel and memory.
pub struct Proc<'h> {
    harness: &'h Harness,
    pid: Pid,
    parent: Option<Pid>,
    name: &'static str,
    handshake: Arc<Handshake>,
}

impl Harness {
    pub fn new() -> Self {
        let fs = MemFs::new();
        let host = TestHost::new();
        let pid = Pid::new(10);
        let handshake = host.spawn_process(pid);

        let mut space = MockSpace::with_pages(&[STACK_PAGE]);
        for page in 0..DATA_PAGES {
            space.map(DATA_PAGE + page * PAGE_SIZE, USER_PAGE);
        }

        Self {
            kernel: Kernel::new(fs.clone(), host),
            fs,
            space,
            pid,
            handshake,
            next_free: Cell::new(DATA_PAGE),
        }
    }

    fn view(&self) -> Proc<'_> {
        Proc {
            harness: self,
            pid: self.pid,
            parent: Some(Pid::new(1)),
            name: "test",
            handshake: self.handshake.clone(),
        }
    }

    pub fn as_process(&self, pid: Pid, name: &'static str) -> Proc<'_> {
        let host = self.kernel.host();
        let handshake = host.lookup(pid).unwrap_or_else(|| host.spawn_process(pid));
        Proc {
            harness: self,
            pid,
            parent: Some(self.pid),
            name,
            handshake,
        }
    }

    pub fn caller(&self) -> Caller<'_> {
        Caller {
            pid: self.pid,
            parent: Some(Pid::new(1)),
            name: "test",
            space: &self.space,
            handshake: &self.handshake,
        }
    }

    pub fn syscall(&self, number: u32, args: &[u32]) -> (TrapResult, i32) {
        self.view().syscall_with_eax(number, args, 0)
    }

    pub fn syscall_with_eax(&self, number: u32, args: &[u32], eax: i32) -> (TrapResult, i32) {
        self.view().syscall_with_eax(number, args, eax)
    }

    pub fn call(&self, number: SyscallNumber, args: &[u32]) -> i32 {
        self.view().call(number, args)
    }

    pub fn trap(&self, number: SyscallNumber, args: &[u32]) -> TrapResult {
        self.view().trap(number, args)
    }

    pub fn data_len(&self) -> usize {
        DATA_PAGES * PAGE_SIZE
    }

    fn alloc(&self, len: usize) -> usize {
        let at = self.next_free.get();
        assert!(at + len <= DATA_PAGE + self.data_len(), "test data region exhausted");
        self.next_free.set(at + len);
        at
    }

    /// Place a NUL-terminated string in user memory.
    pub fn string(&self, s: &str) -> u32 {
        let at = self.alloc(s.len() + 1);
        self.space.poke(VirtAddr::new(at), s.as_bytes());
        self.space.poke(VirtAddr::new(at + s.len()), &[0]);
        at as u32
    }

    pub fn bytes(&self, data: &[u8]) -> u32 {
        let at = self.alloc(data.len());
        self.space.poke(VirtAddr::new(at), data);
        at as u32
    }

    pub fn buffer(&self, len: usize) -> u32 {
        self.alloc(len) as u32
    }

    pub fn fill(&self, len: usize, byte: u8) -> u32 {
        self.bytes(&vec![byte; len])
    }

    pub fn peek(&self, addr: u32, len: usize) -> Vec<u8> {
        self.space.peek(VirtAddr::new(addr as usize), len)
    }
}

impl Proc<'_> {
    pub fn caller(&self) -> Caller<'_> {
        Caller {
            pid: self.pid,
            parent: self.parent,
            name: self.name,
            space: &self.harness.space,
            handshake: &self.handshake,
        }
    }

    pub fn syscall_with_eax(&self, number: u32, args: &[u32], eax: i32) -> (TrapResult, i32) {
        let esp = VirtAddr::new(STACK_PAGE + PAGE_SIZE - SYSCALL_WORDS * WORD_SIZE);
        let mut words = [0u32; SYSCALL_WORDS];
        words[0] = number;
        words[1..=args.len()].copy_from_slice(args);
        self.harness.space.push_words(esp, &words);

        let mut frame = TrapFrame::with_stack(esp);
        frame.set_return(eax);
        let result = self.harness.kernel.handle_trap(&self.caller(), &mut frame);
        (result, frame.return_value())
    }

    pub fn call(&self, number: SyscallNumber, args: &[u32]) -> i32 {
        let (result, value) = self.syscall_with_eax(number as u32, args, 0);
        assert_eq!(result, TrapResult::Resume, "{} did not return", number);
        value
    }

    pub fn trap(&self, number: SyscallNumber, args: &[u32]) -> TrapResult {
        self.syscall_with_eax(number as u32, args, 0).0
    }
}
