//! CHIP-8 CPU: fetch, decode, execute.
//!
//! One `step()` runs one instruction to completion: fetch the 16-bit
//! opcode at PC, advance PC by 2, dispatch on the top nibble (families
//! 0x0, 0x8, 0xE and 0xF sub-dispatch on their low bits), then tick both
//! countdown timers. Control-flow instructions therefore set an absolute
//! new PC rather than an offset.
//!
//! The key-wait instruction (Fx0A) parks the CPU instead of polling:
//! `step()` is a no-op until the host feeds a key press in through
//! `key_down()`, and no other state (timers included) advances while
//! parked.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::Chip8Error;
use crate::font::{FONT, FONT_ADDR, GLYPH_BYTES};
use crate::framebuffer::Framebuffer;
use crate::keypad::Keypad;
use crate::memory::Memory;
use crate::registers::{PROGRAM_ADDR, Registers};

/// Execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Ready to execute the next instruction.
    Running,
    /// Parked on Fx0A until a key press arrives; the key lands in Vx.
    WaitingForKey { x: u8 },
}

/// The CHIP-8 interpreter.
///
/// Owns all machine state exclusively: register file, 4 KB RAM, 64x32
/// framebuffer and keypad. Instances share nothing, so several can run
/// side by side (the tests do).
pub struct Chip8 {
    /// Register file.
    pub regs: Registers,
    memory: Memory,
    framebuffer: Framebuffer,
    keypad: Keypad,
    state: State,
    rng: SmallRng,
    /// Set when the sound timer crosses to zero; drained by `take_beep`.
    beep_pending: bool,
}

impl Chip8 {
    /// Create a machine with the font in low RAM and `rom` loaded verbatim
    /// at 0x200.
    ///
    /// # Errors
    ///
    /// Returns an addressing fault if the ROM does not fit in RAM.
    pub fn new(rom: &[u8]) -> Result<Self, Chip8Error> {
        Self::build(rom, SmallRng::from_os_rng())
    }

    /// Like `new`, but with a deterministic RNG for the Cxkk instruction.
    pub fn new_with_seed(rom: &[u8], seed: u64) -> Result<Self, Chip8Error> {
        Self::build(rom, SmallRng::seed_from_u64(seed))
    }

    fn build(rom: &[u8], rng: SmallRng) -> Result<Self, Chip8Error> {
        let mut memory = Memory::new();
        memory.store_many(FONT_ADDR, &FONT)?;
        memory.store_many(PROGRAM_ADDR, rom)?;

        Ok(Self {
            regs: Registers::new(),
            memory,
            framebuffer: Framebuffer::new(),
            keypad: Keypad::new(),
            state: State::Running,
            rng,
            beep_pending: false,
        })
    }

    /// Execute one instruction and tick the timers.
    ///
    /// While the CPU is parked on the key-wait instruction this returns
    /// immediately without touching any state.
    ///
    /// # Errors
    ///
    /// Fails on an out-of-range memory access or an opcode outside the
    /// instruction set; both are fatal and the caller should stop the run.
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        if matches!(self.state, State::WaitingForKey { .. }) {
            return Ok(());
        }

        let opcode = self.memory.fetch_word(self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(2);
        self.execute(opcode)?;
        self.tick_timers();
        Ok(())
    }

    /// Decode and execute one opcode.
    ///
    /// Field layout: x = bits 8-11, y = bits 4-7, kk = low byte,
    /// nnn = low 12 bits, n = low nibble.
    fn execute(&mut self, opcode: u16) -> Result<(), Chip8Error> {
        let x = usize::from((opcode >> 8) & 0xF);
        let y = usize::from((opcode >> 4) & 0xF);
        let kk = (opcode & 0xFF) as u8;
        let nnn = opcode & 0xFFF;
        let n = usize::from(opcode & 0xF);

        match opcode >> 12 {
            0x0 => match opcode {
                // 00E0 - CLS
                0x00E0 => self.framebuffer.clear(),

                // 00EE - RET
                0x00EE => {
                    self.regs.sp = self.regs.sp.wrapping_sub(2);
                    self.regs.pc = self.memory.fetch_word(u16::from(self.regs.sp))?;
                }

                _ => return Err(Chip8Error::InvalidOpcode(opcode)),
            },

            // 1nnn - JP addr
            0x1 => self.regs.pc = nnn,

            // 2nnn - CALL addr
            0x2 => {
                self.memory.store_word(u16::from(self.regs.sp), self.regs.pc)?;
                self.regs.sp = self.regs.sp.wrapping_add(2);
                self.regs.pc = nnn;
            }

            // 3xkk - SE Vx, byte
            0x3 => {
                if self.regs.v[x] == kk {
                    self.skip();
                }
            }

            // 4xkk - SNE Vx, byte
            0x4 => {
                if self.regs.v[x] != kk {
                    self.skip();
                }
            }

            // 5xy0 - SE Vx, Vy
            0x5 => {
                if self.regs.v[x] == self.regs.v[y] {
                    self.skip();
                }
            }

            // 6xkk - LD Vx, byte
            0x6 => self.regs.v[x] = kk,

            // 7xkk - ADD Vx, byte (no carry out)
            0x7 => self.regs.v[x] = self.regs.v[x].wrapping_add(kk),

            0x8 => self.execute_alu(opcode, x, y)?,

            // 9xy0 - SNE Vx, Vy
            0x9 => {
                if self.regs.v[x] != self.regs.v[y] {
                    self.skip();
                }
            }

            // Annn - LD I, addr
            0xA => self.regs.i = nnn,

            // Bnnn - JP V0, addr
            0xB => self.regs.pc = u16::from(self.regs.v[0]).wrapping_add(nnn),

            // Cxkk - RND Vx, byte
            0xC => self.regs.v[x] = self.rng.random::<u8>() & kk,

            // Dxyn - DRW Vx, Vy, nibble
            0xD => {
                let rows = self.memory.fetch_many(self.regs.i, n)?;
                let collision = self.framebuffer.draw_sprite(
                    usize::from(self.regs.v[x]),
                    usize::from(self.regs.v[y]),
                    rows,
                );
                self.regs.v[0xF] = u8::from(collision);
            }

            0xE => match kk {
                // Ex9E - SKP Vx
                0x9E => {
                    if self.keypad.is_pressed(self.regs.v[x]) {
                        self.skip();
                    }
                }

                // ExA1 - SKNP Vx
                0xA1 => {
                    if !self.keypad.is_pressed(self.regs.v[x]) {
                        self.skip();
                    }
                }

                _ => return Err(Chip8Error::InvalidOpcode(opcode)),
            },

            0xF => self.execute_misc(opcode, kk, x)?,

            _ => unreachable!("top nibble is 4 bits"),
        }

        Ok(())
    }

    /// 8xyN family: register-to-register ALU operations.
    fn execute_alu(&mut self, opcode: u16, x: usize, y: usize) -> Result<(), Chip8Error> {
        let vx = self.regs.v[x];
        let vy = self.regs.v[y];

        // VF is written last, so it survives as the flag output even when
        // x or y is 0xF.
        match opcode & 0xF {
            // 8xy0 - LD Vx, Vy
            0x0 => self.regs.v[x] = vy,

            // 8xy1 - OR Vx, Vy
            0x1 => self.regs.v[x] = vx | vy,

            // 8xy2 - AND Vx, Vy
            0x2 => self.regs.v[x] = vx & vy,

            // 8xy3 - XOR Vx, Vy
            0x3 => self.regs.v[x] = vx ^ vy,

            // 8xy4 - ADD Vx, Vy (VF = carry)
            0x4 => {
                let (sum, carry) = vx.overflowing_add(vy);
                self.regs.v[x] = sum;
                self.regs.v[0xF] = u8::from(carry);
            }

            // 8xy5 - SUB Vx, Vy (VF = 1 when Vx > Vy)
            0x5 => {
                self.regs.v[x] = vx.wrapping_sub(vy);
                self.regs.v[0xF] = u8::from(vx > vy);
            }

            // 8xy6 - SHR Vx (VF = shifted-out bit)
            0x6 => {
                self.regs.v[x] = vx >> 1;
                self.regs.v[0xF] = vx & 1;
            }

            // 8xy7 - SUBN Vx, Vy (VF = 1 when Vy > Vx)
            0x7 => {
                self.regs.v[x] = vy.wrapping_sub(vx);
                self.regs.v[0xF] = u8::from(vy > vx);
            }

            // 8xyE - SHL Vx (VF = shifted-out bit)
            0xE => {
                self.regs.v[x] = vx << 1;
                self.regs.v[0xF] = vx >> 7;
            }

            _ => return Err(Chip8Error::InvalidOpcode(opcode)),
        }

        Ok(())
    }

    /// FxNN family: timers, key wait, index arithmetic, BCD, register
    /// spill and fill.
    fn execute_misc(&mut self, opcode: u16, kk: u8, x: usize) -> Result<(), Chip8Error> {
        match kk {
            // Fx07 - LD Vx, DT
            0x07 => self.regs.v[x] = self.regs.dt,

            // Fx0A - LD Vx, K: park until a key press arrives
            0x0A => self.state = State::WaitingForKey { x: x as u8 },

            // Fx15 - LD DT, Vx
            0x15 => self.regs.dt = self.regs.v[x],

            // Fx18 - LD ST, Vx
            0x18 => self.regs.st = self.regs.v[x],

            // Fx1E - ADD I, Vx
            0x1E => self.regs.i = self.regs.i.wrapping_add(u16::from(self.regs.v[x])),

            // Fx29 - LD F, Vx: I points at the glyph for hex digit Vx
            0x29 => self.regs.i = FONT_ADDR + u16::from(self.regs.v[x]) * GLYPH_BYTES,

            // Fx33 - LD B, Vx: decimal digits at I, I+1, I+2
            0x33 => {
                let value = self.regs.v[x];
                self.memory.store_byte(self.regs.i, value / 100)?;
                self.memory
                    .store_byte(self.regs.i.wrapping_add(1), value / 10 % 10)?;
                self.memory
                    .store_byte(self.regs.i.wrapping_add(2), value % 10)?;
            }

            // Fx55 - LD [I], Vx: spill V0..=Vx to memory
            0x55 => self.memory.store_many(self.regs.i, &self.regs.v[..=x])?,

            // Fx65 - LD Vx, [I]: fill V0..=Vx from memory
            0x65 => {
                let data = self.memory.fetch_many(self.regs.i, x + 1)?;
                self.regs.v[..=x].copy_from_slice(data);
            }

            _ => return Err(Chip8Error::InvalidOpcode(opcode)),
        }

        Ok(())
    }

    /// Skip the next instruction.
    fn skip(&mut self) {
        self.regs.pc = self.regs.pc.wrapping_add(2);
    }

    /// Decrement both timers, saturating at zero. The beep fires exactly
    /// when ST crosses from nonzero to zero, not on every cycle at zero.
    fn tick_timers(&mut self) {
        if self.regs.dt > 0 {
            self.regs.dt -= 1;
        }
        if self.regs.st > 0 {
            self.regs.st -= 1;
            if self.regs.st == 0 {
                self.beep_pending = true;
            }
        }
    }

    /// Feed a key press (0x0-0xF) in from the host.
    ///
    /// If the CPU is parked on Fx0A, the key value lands in Vx and
    /// execution resumes on the next `step()`.
    pub fn key_down(&mut self, key: u8) {
        let key = key & 0xF;
        self.keypad.press(key);
        if let State::WaitingForKey { x } = self.state {
            self.regs.v[usize::from(x)] = key;
            self.state = State::Running;
        }
    }

    /// Feed a key release in from the host. A release never satisfies the
    /// key wait.
    pub fn key_up(&mut self, key: u8) {
        self.keypad.release(key);
    }

    /// Whether the CPU is parked on the key-wait instruction.
    #[must_use]
    pub fn is_waiting_for_key(&self) -> bool {
        matches!(self.state, State::WaitingForKey { .. })
    }

    /// Drain the sound trigger. Returns true at most once per sound-timer
    /// zero-crossing; the host plays its beep when it sees true.
    pub fn take_beep(&mut self) -> bool {
        let pending = self.beep_pending;
        self.beep_pending = false;
        pending
    }

    /// Reference to the framebuffer.
    #[must_use]
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Reference to RAM.
    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Mutable reference to RAM.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Reference to the keypad state.
    #[must_use]
    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm(program: &[u8]) -> Chip8 {
        Chip8::new_with_seed(program, 0xC8).expect("program fits in RAM")
    }

    #[test]
    fn power_on_state() {
        let vm = vm(&[]);
        assert_eq!(vm.regs.pc, 0x200);
        assert_eq!(vm.regs.sp, 0x50);
        assert_eq!(vm.regs.i, 0);
        assert_eq!(vm.regs.dt, 0);
        assert_eq!(vm.regs.st, 0);
        assert_eq!(vm.regs.v, [0; 16]);
    }

    #[test]
    fn font_is_loaded_at_zero() {
        let vm = vm(&[]);
        assert_eq!(vm.memory().fetch_many(0x000, 80).unwrap(), &FONT[..]);
        // First glyph row of "0" and last of "F"
        assert_eq!(vm.memory().fetch_byte(0x000).unwrap(), 0xF0);
        assert_eq!(vm.memory().fetch_byte(0x04F).unwrap(), 0x80);
    }

    #[test]
    fn rom_lands_at_program_addr() {
        let vm = vm(&[0x00, 0xE0, 0x12, 0x00]);
        assert_eq!(vm.memory().fetch_word(0x200).unwrap(), 0x00E0);
        assert_eq!(vm.memory().fetch_word(0x202).unwrap(), 0x1200);
    }

    #[test]
    fn oversized_rom_is_a_fault() {
        let big = [0u8; 4096 - 0x200 + 1];
        assert!(Chip8::new(&big).is_err());
        let just_fits = [0u8; 4096 - 0x200];
        assert!(Chip8::new(&just_fits).is_ok());
    }

    #[test]
    fn step_advances_pc_before_execute() {
        // JP 0x200 at 0x200: jump target is absolute, so PC ends at
        // 0x200 again rather than 0x202
        let mut vm = vm(&[0x12, 0x00]);
        vm.step().unwrap();
        assert_eq!(vm.regs.pc, 0x200);
    }

    #[test]
    fn unknown_opcodes_fault_with_full_word() {
        for (rom, opcode) in [
            ([0x00u8, 0xE1u8], 0x00E1),
            ([0x80, 0x08], 0x8008),
            ([0xE0, 0x00], 0xE000),
            ([0xF0, 0x56], 0xF056),
        ] {
            let mut vm = vm(&rom);
            assert_eq!(vm.step(), Err(Chip8Error::InvalidOpcode(opcode)));
        }
    }

    #[test]
    fn fetch_at_end_of_ram_faults() {
        let mut vm = vm(&[]);
        vm.regs.pc = 0xFFF;
        assert_eq!(
            vm.step(),
            Err(Chip8Error::AddressingFault { addr: 0xFFF, len: 2 })
        );
    }

    #[test]
    fn timers_tick_once_per_step() {
        let mut vm = vm(&[0x00, 0xE0, 0x00, 0xE0]);
        vm.regs.dt = 2;
        vm.step().unwrap();
        assert_eq!(vm.regs.dt, 1);
        vm.step().unwrap();
        assert_eq!(vm.regs.dt, 0);
    }

    #[test]
    fn timers_saturate_at_zero() {
        let mut vm = vm(&[0x00, 0xE0, 0x00, 0xE0]);
        vm.step().unwrap();
        vm.step().unwrap();
        assert_eq!(vm.regs.dt, 0);
        assert_eq!(vm.regs.st, 0);
    }

    #[test]
    fn beep_fires_once_per_zero_crossing() {
        // Four CLS instructions; ST starts at 2
        let mut vm = vm(&[0x00, 0xE0, 0x00, 0xE0, 0x00, 0xE0, 0x00, 0xE0]);
        vm.regs.st = 2;

        vm.step().unwrap(); // ST 2 -> 1
        assert!(!vm.take_beep());
        vm.step().unwrap(); // ST 1 -> 0: crossing
        assert!(vm.take_beep());
        assert!(!vm.take_beep(), "drained");
        vm.step().unwrap(); // ST stays 0
        assert!(!vm.take_beep());
    }

    #[test]
    fn key_wait_parks_the_whole_machine() {
        // F30A then CLS
        let mut vm = vm(&[0xF3, 0x0A, 0x00, 0xE0]);
        vm.regs.dt = 10;
        vm.step().unwrap();
        assert!(vm.is_waiting_for_key());
        assert_eq!(vm.regs.dt, 9, "the Fx0A cycle itself ticks timers");

        // Parked: nothing advances
        let pc = vm.regs.pc;
        for _ in 0..5 {
            vm.step().unwrap();
        }
        assert_eq!(vm.regs.pc, pc);
        assert_eq!(vm.regs.dt, 9);

        // Release does not satisfy the wait
        vm.key_up(0x7);
        assert!(vm.is_waiting_for_key());

        vm.key_down(0xB);
        assert!(!vm.is_waiting_for_key());
        assert_eq!(vm.regs.v[0x3], 0xB);

        vm.step().unwrap();
        assert_eq!(vm.regs.dt, 8, "timers run again after resume");
    }

    #[test]
    fn rnd_is_masked() {
        // C07B: RND V0 with mask 0x7B, repeated
        let mut vm = vm(&[0xC0, 0x7B, 0xC0, 0x7B, 0xC0, 0x7B, 0xC0, 0x7B]);
        for _ in 0..4 {
            vm.step().unwrap();
            assert_eq!(vm.regs.v[0] & !0x7B, 0);
        }
    }

    #[test]
    fn rnd_is_deterministic_under_seed() {
        let mut a = Chip8::new_with_seed(&[0xC0, 0xFF], 7).unwrap();
        let mut b = Chip8::new_with_seed(&[0xC0, 0xFF], 7).unwrap();
        a.step().unwrap();
        b.step().unwrap();
        assert_eq!(a.regs.v[0], b.regs.v[0]);
    }
}
