use crate::{
    bus::Bus,
    cpu::{
        BrkMode, CPU, CpuConfig, CpuError, Interrupt, RunState, StackCheck, StopReason,
        flags::{
            FLAG_BREAK, FLAG_CARRY, FLAG_DECIMAL, FLAG_INTERRUPT_DISABLE, FLAG_NEGATIVE,
            FLAG_OVERFLOW, FLAG_UNUSED, FLAG_ZERO,
        },
    },
    memory::{IoPolicy, Memory, MemoryError},
};

/// Flat 64 KiB with no mirroring, and a write log for ordering checks.
struct TestBus {
    mem: [u8; 65536],
    writes: Vec<(u16, u8)>,
}

impl TestBus {
    fn new() -> Self {
        Self {
            mem: [0; 65536],
            writes: Vec::new(),
        }
    }

    fn with_program(program: &[u8]) -> Self {
        let mut bus = Self::new();
        bus.mem[0x8000..0x8000 + program.len()].copy_from_slice(program);
        bus.mem[0xFFFC] = 0x00;
        bus.mem[0xFFFD] = 0x80;
        bus
    }
}

impl Bus for TestBus {
    fn read(&mut self, addr: u16) -> Result<u8, MemoryError> {
        Ok(self.mem[addr as usize])
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), MemoryError> {
        self.writes.push((addr, data));
        self.mem[addr as usize] = data;
        Ok(())
    }

    fn peek(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }
}

fn new_cpu(bus: TestBus) -> CPU<TestBus> {
    let mut cpu = CPU::new(bus);
    cpu.reset().unwrap();
    cpu
}

fn run_program(program: &[u8]) -> CPU<TestBus> {
    let mut cpu = new_cpu(TestBus::with_program(program));
    assert_eq!(cpu.run().unwrap(), StopReason::Halted);
    cpu
}

fn flag(cpu: &CPU<TestBus>, mask: u8) -> bool {
    cpu.status & mask != 0
}

#[test]
fn reset_loads_vector_and_initial_state() {
    let mut bus = TestBus::new();
    bus.mem[0xFFFC] = 0x34;
    bus.mem[0xFFFD] = 0x12;

    let mut cpu = CPU::new(bus);
    assert_eq!(cpu.state(), RunState::ResetPending);
    cpu.a = 9;

    cpu.reset().unwrap();

    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(cpu.sp, 0xFD);
    assert_eq!(cpu.status, 0x24);
    assert_eq!((cpu.a, cpu.x, cpu.y), (0, 0, 0));
    assert_eq!(cpu.state(), RunState::Running);
}

#[test]
fn reset_sp_is_configurable() {
    let config = CpuConfig {
        reset_sp: 0xFF,
        ..CpuConfig::default()
    };
    let mut cpu = CPU::with_config(TestBus::with_program(&[]), config);
    cpu.reset().unwrap();
    assert_eq!(cpu.sp, 0xFF);
}

#[test]
fn step_before_reset_is_refused() {
    let mut cpu = CPU::new(TestBus::with_program(&[0xEA]));
    assert_eq!(cpu.step(), Err(CpuError::NotRunning { pc: 0 }));
}

#[test]
fn lda_immediate_loads_value() {
    let mut cpu = new_cpu(TestBus::with_program(&[0xA9, 0x42])); // LDA #$42

    let outcome = cpu.step().unwrap();

    assert_eq!(cpu.a, 0x42);
    assert_eq!(cpu.pc, 0x8002);
    assert_eq!(outcome.cycles, 2);
    assert_eq!(outcome.pc, 0x8000);
    assert_eq!(outcome.opcode, 0xA9);
}

#[test]
fn lda_sets_zero_flag() {
    let cpu = run_program(&[0xA9, 0x00, 0x00]); // LDA #$00
    assert!(flag(&cpu, FLAG_ZERO));
    assert!(!flag(&cpu, FLAG_NEGATIVE));
}

#[test]
fn lda_sets_negative_flag() {
    let cpu = run_program(&[0xA9, 0x80, 0x00]); // LDA #$80
    assert!(flag(&cpu, FLAG_NEGATIVE));
    assert!(!flag(&cpu, FLAG_ZERO));
}

#[test]
fn sta_writes_to_memory_without_touching_flags() {
    let mut cpu = new_cpu(TestBus::with_program(&[
        0xA9, 0x00, // LDA #$00
        0x8D, 0x00, 0x02, // STA $0200
    ]));
    cpu.step().unwrap();
    let status = cpu.status;
    cpu.step().unwrap();

    assert_eq!(cpu.bus.mem[0x0200], 0x00);
    assert_eq!(cpu.bus.writes, vec![(0x0200, 0x00)]);
    assert_eq!(cpu.status, status);
}

#[test]
fn transfers_update_flags_except_txs() {
    let cpu = run_program(&[
        0xA2, 0x00, // LDX #$00
        0x9A, // TXS
        0xA9, 0x90, // LDA #$90
        0xA8, // TAY
        0x00,
    ]);
    assert_eq!(cpu.sp, 0x00);
    assert_eq!(cpu.y, 0x90);
    assert!(flag(&cpu, FLAG_NEGATIVE));

    let cpu = run_program(&[0xBA, 0x00]); // TSX
    assert_eq!(cpu.x, 0xFD);
    assert!(flag(&cpu, FLAG_NEGATIVE));
}

#[test]
fn jmp_changes_program_counter() {
    let mut bus = TestBus::with_program(&[0x4C, 0x00, 0x90]); // JMP $9000
    bus.mem[0x9000] = 0xA9; // LDA #$55
    bus.mem[0x9001] = 0x55;

    let mut cpu = new_cpu(bus);
    cpu.step().unwrap();
    assert_eq!(cpu.pc, 0x9000);
    cpu.step().unwrap();

    assert_eq!(cpu.a, 0x55);
}

#[test]
fn jmp_onto_its_own_operand_is_still_a_jump() {
    // JMP $8001 lands where the fall-through PC would have been before advancing
    let mut cpu = new_cpu(TestBus::with_program(&[0x4C, 0x01, 0x80]));
    cpu.step().unwrap();
    assert_eq!(cpu.pc, 0x8001);
}

#[test]
fn inx_wraps_and_sets_zero() {
    let cpu = run_program(&[0xA2, 0xFF, 0xE8, 0x00]); // LDX #$FF; INX
    assert_eq!(cpu.x, 0x00);
    assert!(flag(&cpu, FLAG_ZERO));
}

#[test]
fn dey_wraps_to_ff() {
    let cpu = run_program(&[0x88, 0x00]); // DEY
    assert_eq!(cpu.y, 0xFF);
    assert!(flag(&cpu, FLAG_NEGATIVE));
}

#[test]
fn inc_and_dec_memory() {
    let mut bus = TestBus::with_program(&[
        0xE6, 0x10, // INC $10
        0xC6, 0x11, // DEC $11
        0x00,
    ]);
    bus.mem[0x10] = 0x7F;
    bus.mem[0x11] = 0x01;

    let mut cpu = new_cpu(bus);
    cpu.step().unwrap();
    assert_eq!(cpu.bus.mem[0x10], 0x80);
    assert!(flag(&cpu, FLAG_NEGATIVE));

    cpu.step().unwrap();
    assert_eq!(cpu.bus.mem[0x11], 0x00);
    assert!(flag(&cpu, FLAG_ZERO));
}

#[test]
fn adc_without_carry_in() {
    let cpu = run_program(&[0xA9, 0x10, 0x69, 0x20, 0x00]);
    assert_eq!(cpu.a, 0x30);
    assert!(!flag(&cpu, FLAG_CARRY));
    assert!(!flag(&cpu, FLAG_OVERFLOW));
}

#[test]
fn adc_uses_and_produces_carry() {
    let cpu = run_program(&[
        0x38, // SEC
        0xA9, 0xFF, // LDA #$FF
        0x69, 0x01, // ADC #$01
        0x00,
    ]);
    // $FF + $01 + 1 = $101
    assert_eq!(cpu.a, 0x01);
    assert!(flag(&cpu, FLAG_CARRY));
    assert!(!flag(&cpu, FLAG_OVERFLOW));
    assert!(!flag(&cpu, FLAG_ZERO));
}

#[test]
fn adc_negative_overflow() {
    let cpu = run_program(&[0xA9, 0x80, 0x69, 0xFF, 0x00]);
    // -128 + -1 overflows to +127
    assert_eq!(cpu.a, 0x7F);
    assert!(flag(&cpu, FLAG_CARRY));
    assert!(flag(&cpu, FLAG_OVERFLOW));
}

#[test]
fn adc_ignores_decimal_flag() {
    let cpu = run_program(&[0xF8, 0xA9, 0x09, 0x69, 0x01, 0x00]); // SED; LDA #$09; ADC #$01
    assert_eq!(cpu.a, 0x0A);
    assert!(flag(&cpu, FLAG_DECIMAL));
}

#[test]
fn sbc_borrows() {
    let cpu = run_program(&[
        0x38, // SEC
        0xA9, 0x05, // LDA #$05
        0xE9, 0x03, // SBC #$03
        0x00,
    ]);
    assert_eq!(cpu.a, 0x02);
    assert!(flag(&cpu, FLAG_CARRY));

    let cpu = run_program(&[
        0x38, // SEC
        0xA9, 0x03, // LDA #$03
        0xE9, 0x05, // SBC #$05
        0x00,
    ]);
    assert_eq!(cpu.a, 0xFE);
    assert!(!flag(&cpu, FLAG_CARRY));
    assert!(flag(&cpu, FLAG_NEGATIVE));
}

#[test]
fn sbc_with_clear_carry_subtracts_one_more() {
    let cpu = run_program(&[0x18, 0xA9, 0x05, 0xE9, 0x03, 0x00]); // CLC; LDA #5; SBC #3
    assert_eq!(cpu.a, 0x01);
}

#[test]
fn sbc_signed_overflow() {
    let cpu = run_program(&[0x38, 0xA9, 0x80, 0xE9, 0x01, 0x00]); // -128 - 1
    assert_eq!(cpu.a, 0x7F);
    assert!(flag(&cpu, FLAG_OVERFLOW));
    assert!(flag(&cpu, FLAG_CARRY));
}

#[test]
fn adc_carry_is_the_ninth_bit() {
    for (a, operand, carry) in [(0x00u8, 0x00u8, 0u8), (0x7F, 0x7F, 1), (0xFF, 0xFF, 1), (0x50, 0xB0, 0)] {
        let set_carry = if carry == 1 { 0x38 } else { 0x18 };
        let cpu = run_program(&[set_carry, 0xA9, a, 0x69, operand, 0x00]);

        let sum = a as u16 + operand as u16 + carry as u16;
        assert_eq!(cpu.a, sum as u8);
        assert_eq!(flag(&cpu, FLAG_CARRY), sum > 0xFF);
    }
}

#[test]
fn cmp_sets_carry_zero_negative() {
    let cpu = run_program(&[0xA9, 0x40, 0xC9, 0x40, 0x00]);
    assert!(flag(&cpu, FLAG_CARRY));
    assert!(flag(&cpu, FLAG_ZERO));
    assert!(!flag(&cpu, FLAG_NEGATIVE));

    let cpu = run_program(&[0xA9, 0x40, 0xC9, 0x41, 0x00]);
    assert!(!flag(&cpu, FLAG_CARRY));
    assert!(!flag(&cpu, FLAG_ZERO));
    assert!(flag(&cpu, FLAG_NEGATIVE));
    assert_eq!(cpu.a, 0x40);
}

#[test]
fn cpx_and_cpy_compare_index_registers() {
    let cpu = run_program(&[0xA2, 0x10, 0xE0, 0x08, 0xA0, 0x01, 0xC0, 0x02, 0x00]);
    // CPY #$02 with Y=1 is the last compare
    assert!(!flag(&cpu, FLAG_CARRY));
    assert!(flag(&cpu, FLAG_NEGATIVE));
}

#[test]
fn bitwise_ops() {
    let cpu = run_program(&[0xA9, 0xF0, 0x29, 0x3C, 0x00]); // AND
    assert_eq!(cpu.a, 0x30);

    let cpu = run_program(&[0xA9, 0xF0, 0x09, 0x0F, 0x00]); // ORA
    assert_eq!(cpu.a, 0xFF);
    assert!(flag(&cpu, FLAG_NEGATIVE));

    let cpu = run_program(&[0xA9, 0xFF, 0x49, 0xFF, 0x00]); // EOR
    assert_eq!(cpu.a, 0x00);
    assert!(flag(&cpu, FLAG_ZERO));
}

#[test]
fn bit_copies_bits_7_and_6() {
    let mut bus = TestBus::with_program(&[0xA9, 0x01, 0x24, 0x10, 0x00]); // LDA #1; BIT $10
    bus.mem[0x10] = 0xC0;

    let mut cpu = new_cpu(bus);
    cpu.run().unwrap();

    assert!(flag(&cpu, FLAG_ZERO));
    assert!(flag(&cpu, FLAG_NEGATIVE));
    assert!(flag(&cpu, FLAG_OVERFLOW));
    assert_eq!(cpu.a, 0x01);
}

#[test]
fn asl_accumulator_and_memory() {
    let cpu = run_program(&[0xA9, 0x81, 0x0A, 0x00]);
    assert_eq!(cpu.a, 0x02);
    assert!(flag(&cpu, FLAG_CARRY));

    let mut bus = TestBus::with_program(&[0x06, 0x20, 0x00]); // ASL $20
    bus.mem[0x20] = 0x40;
    let mut cpu = new_cpu(bus);
    cpu.run().unwrap();
    assert_eq!(cpu.bus.mem[0x20], 0x80);
    assert!(flag(&cpu, FLAG_NEGATIVE));
    assert!(!flag(&cpu, FLAG_CARRY));
    assert_eq!(cpu.a, 0x00);
}

#[test]
fn lsr_clears_negative() {
    let cpu = run_program(&[0xA9, 0x01, 0x4A, 0x00]);
    assert_eq!(cpu.a, 0x00);
    assert!(flag(&cpu, FLAG_CARRY));
    assert!(flag(&cpu, FLAG_ZERO));
    assert!(!flag(&cpu, FLAG_NEGATIVE));
}

#[test]
fn rol_and_ror_rotate_through_carry() {
    let cpu = run_program(&[0x38, 0xA9, 0x80, 0x2A, 0x00]); // SEC; LDA #$80; ROL A
    assert_eq!(cpu.a, 0x01);
    assert!(flag(&cpu, FLAG_CARRY));

    let cpu = run_program(&[0x38, 0xA9, 0x01, 0x6A, 0x00]); // SEC; LDA #$01; ROR A
    assert_eq!(cpu.a, 0x80);
    assert!(flag(&cpu, FLAG_CARRY));
    assert!(flag(&cpu, FLAG_NEGATIVE));
}

#[test]
fn ror_memory_writes_back() {
    let mut bus = TestBus::with_program(&[0x66, 0x30, 0x00]); // ROR $30
    bus.mem[0x30] = 0x02;
    let mut cpu = new_cpu(bus);
    cpu.run().unwrap();

    assert_eq!(cpu.bus.mem[0x30], 0x01);
    assert!(!flag(&cpu, FLAG_CARRY));
}

#[test]
fn bne_loops_until_zero() {
    let mut cpu = new_cpu(TestBus::with_program(&[
        0xA2, 0x03, // LDX #3
        0xCA, // DEX
        0xD0, 0xFD, // BNE -3
    ]));

    for _ in 0..7 {
        cpu.step().unwrap();
    }

    assert_eq!(cpu.x, 0x00);
    assert_eq!(cpu.pc, 0x8005);
}

#[test]
fn branch_cycles() {
    // not taken: 2
    let mut cpu = new_cpu(TestBus::with_program(&[0xF0, 0x10]));
    assert_eq!(cpu.step().unwrap().cycles, 2);
    assert_eq!(cpu.pc, 0x8002);

    // taken, same page: 3
    let mut cpu = new_cpu(TestBus::with_program(&[0xD0, 0x10]));
    assert_eq!(cpu.step().unwrap().cycles, 3);
    assert_eq!(cpu.pc, 0x8012);

    // taken, page crossed: 4
    let mut cpu = new_cpu(TestBus::with_program(&[0xD0, 0x80]));
    assert_eq!(cpu.step().unwrap().cycles, 4);
    assert_eq!(cpu.pc, 0x7F82);
}

#[test]
fn every_branch_tests_its_flag() {
    // (opcode, flag, branch when set)
    let cases = [
        (0x90, FLAG_CARRY, false),
        (0xB0, FLAG_CARRY, true),
        (0xD0, FLAG_ZERO, false),
        (0xF0, FLAG_ZERO, true),
        (0x10, FLAG_NEGATIVE, false),
        (0x30, FLAG_NEGATIVE, true),
        (0x50, FLAG_OVERFLOW, false),
        (0x70, FLAG_OVERFLOW, true),
    ];

    for (opcode, mask, when_set) in cases {
        for set in [false, true] {
            let mut cpu = new_cpu(TestBus::with_program(&[opcode, 0x04]));
            cpu.status = if set { mask | FLAG_UNUSED } else { FLAG_UNUSED };
            cpu.step().unwrap();

            let expected = if set == when_set { 0x8006 } else { 0x8002 };
            assert_eq!(cpu.pc, expected, "${opcode:02X} with flag set={set}");
        }
    }
}

#[test]
fn absolute_x_read_pays_for_page_cross() {
    let mut cpu = new_cpu(TestBus::with_program(&[0xBD, 0xFF, 0x00])); // LDA $00FF,X
    cpu.x = 1;
    assert_eq!(cpu.step().unwrap().cycles, 5);

    let mut cpu = new_cpu(TestBus::with_program(&[0x9D, 0xFF, 0x00])); // STA $00FF,X
    cpu.x = 1;
    assert_eq!(cpu.step().unwrap().cycles, 5);
}

#[test]
fn jsr_and_rts_work() {
    let mut bus = TestBus::with_program(&[
        0x20, 0x00, 0x90, // JSR $9000
        0xA9, 0x11, // LDA #$11
    ]);
    // subroutine
    bus.mem[0x9000] = 0xA9; // LDA #$22
    bus.mem[0x9001] = 0x22;
    bus.mem[0x9002] = 0x60; // RTS

    let mut cpu = new_cpu(bus);

    cpu.step().unwrap(); // JSR
    assert_eq!(cpu.sp, 0xFB);
    // return address is the JSR's last byte, pushed high first
    assert_eq!(cpu.bus.mem[0x01FD], 0x80);
    assert_eq!(cpu.bus.mem[0x01FC], 0x02);

    cpu.step().unwrap(); // LDA #$22
    cpu.step().unwrap(); // RTS
    assert_eq!(cpu.pc, 0x8003);
    assert_eq!(cpu.sp, 0xFD);

    cpu.step().unwrap(); // LDA #$11
    assert_eq!(cpu.a, 0x11);
}

#[test]
fn pha_pla_round_trip() {
    let cpu = run_program(&[
        0xA9, 0x99, // LDA #$99
        0x48, // PHA
        0xA9, 0x00, // LDA #$00
        0x68, // PLA
        0x00,
    ]);
    assert_eq!(cpu.a, 0x99);
    assert_eq!(cpu.sp, 0xFD);
    assert!(flag(&cpu, FLAG_NEGATIVE));
}

#[test]
fn php_pushes_break_and_unused() {
    let mut cpu = new_cpu(TestBus::with_program(&[0x08])); // PHP
    cpu.status = FLAG_CARRY;
    cpu.step().unwrap();

    assert_eq!(cpu.bus.mem[0x01FD], FLAG_CARRY | FLAG_BREAK | FLAG_UNUSED);
}

#[test]
fn plp_clears_break_and_sets_unused() {
    let mut cpu = new_cpu(TestBus::with_program(&[
        0xA9, 0xFF, // LDA #$FF
        0x48, // PHA
        0x28, // PLP
    ]));
    for _ in 0..3 {
        cpu.step().unwrap();
    }
    assert_eq!(cpu.status, 0xFF & !FLAG_BREAK);
}

#[test]
fn php_plp_round_trip_modulo_break() {
    let cpu = run_program(&[0x38, 0xF8, 0x08, 0x18, 0xD8, 0x28, 0x00]); // SEC SED PHP CLC CLD PLP
    assert!(flag(&cpu, FLAG_CARRY));
    assert!(flag(&cpu, FLAG_DECIMAL));
    assert!(!flag(&cpu, FLAG_BREAK));
    assert!(flag(&cpu, FLAG_UNUSED));
}

#[test]
fn flag_instructions() {
    let mut cpu = new_cpu(TestBus::with_program(&[
        0x38, 0x78, 0xF8, // SEC SEI SED
        0x18, 0x58, 0xD8, 0xB8, // CLC CLI CLD CLV
    ]));
    cpu.status |= FLAG_OVERFLOW;

    for _ in 0..3 {
        cpu.step().unwrap();
    }
    assert!(flag(&cpu, FLAG_CARRY) && flag(&cpu, FLAG_INTERRUPT_DISABLE) && flag(&cpu, FLAG_DECIMAL));

    for _ in 0..4 {
        cpu.step().unwrap();
    }
    assert_eq!(cpu.status, FLAG_UNUSED);
}

#[test]
fn nop_only_advances() {
    let mut cpu = new_cpu(TestBus::with_program(&[0xEA]));
    let before = cpu.registers();
    let outcome = cpu.step().unwrap();

    assert_eq!(outcome.cycles, 2);
    assert_eq!(cpu.pc, before.pc + 1);
    assert_eq!(cpu.a, before.a);
    assert_eq!(cpu.status, before.status);
}

#[test]
fn brk_halts_by_default() {
    let mut cpu = new_cpu(TestBus::with_program(&[0xEA, 0x00]));
    assert_eq!(cpu.run().unwrap(), StopReason::Halted);

    assert!(cpu.is_halted());
    assert_eq!(cpu.pc, 0x8001);
    assert_eq!(cpu.sp, 0xFD);

    // further steps are no-ops
    let outcome = cpu.step().unwrap();
    assert!(outcome.halted);
    assert_eq!(outcome.cycles, 0);
}

#[test]
fn brk_jumps_to_irq_vector() {
    let mut bus = TestBus::with_program(&[0x00]); // BRK
    bus.mem[0xFFFE] = 0x00;
    bus.mem[0xFFFF] = 0x90;

    let config = CpuConfig {
        brk: BrkMode::Interrupt,
        ..CpuConfig::default()
    };
    let mut cpu = CPU::with_config(bus, config);
    cpu.reset().unwrap();
    let outcome = cpu.step().unwrap();

    assert_eq!(cpu.pc, 0x9000);
    assert_eq!(outcome.cycles, 7);
    assert!(!outcome.halted);
    assert!(flag(&cpu, FLAG_INTERRUPT_DISABLE));
    // PC + 2, then P with B and U
    assert_eq!(cpu.bus.mem[0x01FD], 0x80);
    assert_eq!(cpu.bus.mem[0x01FC], 0x02);
    assert_eq!(cpu.bus.mem[0x01FB], 0x24 | FLAG_BREAK);
}

#[test]
fn brk_rti_round_trip() {
    let mut bus = TestBus::with_program(&[0x00, 0xEA, 0xA9, 0x07]); // BRK, pad, LDA #7
    bus.mem[0xFFFE] = 0x00;
    bus.mem[0xFFFF] = 0x90;
    bus.mem[0x9000] = 0x40; // RTI

    let config = CpuConfig {
        brk: BrkMode::Interrupt,
        ..CpuConfig::default()
    };
    let mut cpu = CPU::with_config(bus, config);
    cpu.reset().unwrap();

    cpu.step().unwrap(); // BRK
    cpu.step().unwrap(); // RTI
    assert_eq!(cpu.pc, 0x8002);
    assert!(!flag(&cpu, FLAG_BREAK));
    assert!(flag(&cpu, FLAG_UNUSED));

    cpu.step().unwrap();
    assert_eq!(cpu.a, 0x07);
}

#[test]
fn nmi_is_taken_before_next_instruction() {
    let mut bus = TestBus::with_program(&[0xEA]);
    bus.mem[0xFFFA] = 0x00;
    bus.mem[0xFFFB] = 0xA0;
    bus.mem[0xA000] = 0xE8; // INX

    let mut cpu = new_cpu(bus);
    cpu.status &= !FLAG_INTERRUPT_DISABLE;
    cpu.trigger_nmi();

    let outcome = cpu.step().unwrap();
    assert_eq!(outcome.interrupt, Some(Interrupt::Nmi));
    assert_eq!(outcome.pc, 0xA000);
    assert_eq!(outcome.cycles, 7 + 2);
    assert_eq!(cpu.x, 1);

    // return address $8000, then P without B
    assert_eq!(cpu.bus.mem[0x01FD], 0x80);
    assert_eq!(cpu.bus.mem[0x01FC], 0x00);
    assert_eq!(cpu.bus.mem[0x01FB], FLAG_UNUSED);
    assert!(flag(&cpu, FLAG_INTERRUPT_DISABLE));
}

#[test]
fn nmi_ignores_interrupt_disable() {
    let mut bus = TestBus::with_program(&[0xEA]);
    bus.mem[0xFFFB] = 0xA0;
    bus.mem[0xA000] = 0xEA;

    let mut cpu = new_cpu(bus);
    assert!(flag(&cpu, FLAG_INTERRUPT_DISABLE));
    cpu.trigger_nmi();

    assert_eq!(cpu.step().unwrap().interrupt, Some(Interrupt::Nmi));
}

#[test]
fn irq_is_masked_by_interrupt_disable() {
    let mut bus = TestBus::with_program(&[0xEA, 0xEA]);
    bus.mem[0xFFFF] = 0xB0;
    bus.mem[0xB000] = 0xEA;

    let mut cpu = new_cpu(bus);
    cpu.trigger_irq();
    let outcome = cpu.step().unwrap();
    assert_eq!(outcome.interrupt, None);
    assert_eq!(cpu.pc, 0x8001);

    cpu.status &= !FLAG_INTERRUPT_DISABLE;
    cpu.trigger_irq();
    let outcome = cpu.step().unwrap();
    assert_eq!(outcome.interrupt, Some(Interrupt::Irq));
    assert_eq!(outcome.pc, 0xB000);
}

#[test]
fn illegal_opcode_faults_with_pc() {
    let mut cpu = new_cpu(TestBus::with_program(&[0xEA, 0x02]));

    assert_eq!(
        cpu.run(),
        Err(CpuError::IllegalOpcode {
            opcode: 0x02,
            pc: 0x8001
        })
    );
    assert_eq!(cpu.state(), RunState::Faulted);
    assert_eq!(cpu.step(), Err(CpuError::NotRunning { pc: 0x8002 }));

    cpu.reset().unwrap();
    assert_eq!(cpu.state(), RunState::Running);
}

#[test]
fn unmapped_region_fault_carries_pc() {
    let mut memory = Memory::with_policy(IoPolicy::Fault);
    memory.load_prg(0x8000, &[0xEA, 0xAD, 0x02, 0x20]); // NOP; LDA $2002

    let mut cpu = CPU::new(memory);
    cpu.reset().unwrap();

    match cpu.run() {
        Err(err @ CpuError::Bus { .. }) => {
            assert_eq!(err.pc(), 0x8001);
            assert!(matches!(
                err,
                CpuError::Bus {
                    source: MemoryError::UnmappedRegion { addr: 0x2002 },
                    ..
                }
            ));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn stack_underflow_is_fatal_when_configured() {
    let config = CpuConfig {
        reset_sp: 0xFF,
        stack_check: StackCheck::Fatal,
        ..CpuConfig::default()
    };
    let mut cpu = CPU::with_config(TestBus::with_program(&[0x60]), config); // RTS
    cpu.reset().unwrap();

    assert!(matches!(
        cpu.step(),
        Err(CpuError::StackImbalance { pc: 0x8000, sp: 0xFF, .. })
    ));
}

#[test]
fn stack_wraps_when_unchecked() {
    let config = CpuConfig {
        reset_sp: 0x00,
        stack_check: StackCheck::Off,
        ..CpuConfig::default()
    };
    let mut cpu = CPU::with_config(TestBus::with_program(&[0x48, 0x68]), config); // PHA PLA
    cpu.reset().unwrap();
    cpu.a = 0x5A;

    cpu.step().unwrap();
    assert_eq!(cpu.sp, 0xFF);
    assert_eq!(cpu.bus.mem[0x0100], 0x5A);

    cpu.a = 0;
    cpu.step().unwrap();
    assert_eq!(cpu.sp, 0x00);
    assert_eq!(cpu.a, 0x5A);
}

#[test]
fn callback_sees_every_step_and_can_cancel() {
    let mut cpu = new_cpu(TestBus::with_program(&[0xE8, 0xE8, 0xE8, 0xE8, 0x00]));
    let mut seen = Vec::new();

    let reason = cpu
        .run_with_callback(|tick| {
            seen.push((tick.outcome.pc, tick.registers.x));
            tick.registers.x < 2
        })
        .unwrap();

    assert_eq!(reason, StopReason::Cancelled);
    assert_eq!(seen, vec![(0x8000, 1), (0x8001, 2)]);
    assert_eq!(cpu.x, 2);
}

#[test]
fn callback_can_feed_memory_mapped_input() {
    // LDA $FF; BRK
    let mut cpu = new_cpu(TestBus::with_program(&[0xEA, 0xA5, 0xFF, 0x00]));

    cpu.run_with_callback(|tick| {
        tick.bus.mem[0xFF] = 0x77;
        true
    })
    .unwrap();

    assert_eq!(cpu.a, 0x77);
}

#[test]
fn memory_writes_follow_program_order() {
    let mut cpu = new_cpu(TestBus::with_program(&[
        0xA9, 0x01, 0x85, 0x10, // LDA #1; STA $10
        0xA9, 0x02, 0x85, 0x11, // LDA #2; STA $11
        0x20, 0x00, 0x90, // JSR $9000
    ]));
    cpu.bus.mem[0x9000] = 0x00;
    cpu.run().unwrap();

    assert_eq!(
        cpu.bus.writes,
        vec![(0x10, 1), (0x11, 2), (0x01FD, 0x80), (0x01FC, 0x0A)]
    );
}

#[test]
fn registers_round_trip() {
    let mut cpu = new_cpu(TestBus::new());
    let mut regs = cpu.registers();
    regs.a = 1;
    regs.x = 2;
    regs.y = 3;
    regs.sp = 0x80;
    regs.pc = 0x1234;
    regs.status = 0xE5;

    cpu.set_registers(regs);
    assert_eq!(cpu.registers(), regs);
}
