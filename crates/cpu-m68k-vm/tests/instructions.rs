//! Hand-assembled programs run through the full dispatch table.

use cpu_m68k_vm::{
    Bus, Context, ExceptionKind, FC_ALL, FunctionCode, Memory, Processor, Size, State, shared,
};

const ORG: u32 = 0x1000;
const STACK: u32 = 0x8000;

fn load_words(ctx: &mut Context, addr: u32, words: &[u16]) {
    let mut a = addr;
    for &w in words {
        ctx.bus_mut()
            .write16(FunctionCode::SupervisorProgram, a, w)
            .expect("program fits in RAM");
        a = a.wrapping_add(2);
    }
}

/// 64 KiB of RAM, supervisor mode, SSP at `STACK`, program at `ORG`.
fn machine(program: &[u16]) -> Context {
    let mut bus = Bus::new();
    bus.map(FC_ALL, 0, 0x1_0000, shared(Memory::ram(0, 0x1_0000)));
    let mut ctx = Context::new(bus);
    ctx.regs.a[7] = STACK;
    load_words(&mut ctx, ORG, program);
    ctx
}

fn step(cpu: &Processor, ctx: &mut Context, pc: u32) -> u32 {
    cpu.step(pc, ctx)
        .unwrap_or_else(|e| panic!("unexpected {e}"))
}

#[test]
fn add_word_overflow_sets_n_and_v() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0xD07C, 0x7FFF]); // add.w #$7fff,d0
    ctx.regs.d[0] = 1;
    assert_eq!(step(&cpu, &mut ctx, ORG), ORG + 4);
    assert_eq!(ctx.regs.d[0], 0x8000);
    let cc = ctx.regs.ccr;
    assert!(cc.n() && cc.v());
    assert!(!cc.z() && !cc.c() && !cc.x());
}

#[test]
fn word_add_keeps_upper_half_of_data_register() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0xD041]); // add.w d1,d0
    ctx.regs.d[0] = 0x1234_FFFF;
    ctx.regs.d[1] = 1;
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.d[0], 0x1234_0000);
    assert!(ctx.regs.ccr.z() && ctx.regs.ccr.c() && ctx.regs.ccr.x());
}

#[test]
fn moveq_sign_extends() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x70FF, 0x7201]); // moveq #-1,d0 ; moveq #1,d1
    let pc = step(&cpu, &mut ctx, ORG);
    step(&cpu, &mut ctx, pc);
    assert_eq!(ctx.regs.d[0], 0xFFFF_FFFF);
    assert_eq!(ctx.regs.d[1], 1);
    assert!(!ctx.regs.ccr.n());
}

#[test]
fn dbf_counts_down_to_minus_one() {
    let cpu = Processor::new();
    let mut ctx = machine(&[
        0x7002, // moveq #2,d0
        0x5241, // loop: addq.w #1,d1
        0x51C8, 0xFFFC, // dbf d0,loop
        0x4E72, 0x2700, // stop #$2700
    ]);
    assert_eq!(cpu.run(ORG, &mut ctx), Ok(ORG + 12));
    assert_eq!(ctx.state(), State::Stopped);
    assert_eq!(ctx.regs.d[1], 3);
    assert_eq!(ctx.regs.d[0], 0x0000_FFFF);
}

#[test]
fn dbcc_with_true_condition_falls_through() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x57C8, 0xFFFC]); // dbeq d0,*-2
    ctx.regs.d[0] = 5;
    ctx.regs.ccr.set_bits(0x04);
    assert_eq!(step(&cpu, &mut ctx, ORG), ORG + 4);
    assert_eq!(ctx.regs.d[0], 5);
}

#[test]
fn divide_by_zero_traps_before_writing() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x80FC, 0x0000]); // divu #0,d0
    ctx.regs.d[0] = 0x1234_5678;
    let e = cpu.step(ORG, &mut ctx).unwrap_err();
    assert_eq!(e.kind, ExceptionKind::ZeroDivide);
    assert_eq!(e.vector(), 5);
    assert_eq!(e.pc, ORG);
    assert_eq!(e.return_pc, ORG + 4);
    assert_eq!(ctx.regs.d[0], 0x1234_5678);
}

#[test]
fn divu_quotient_and_remainder() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x80FC, 0x0007]); // divu #7,d0
    ctx.regs.d[0] = 100;
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.d[0], 0x0002_000E);
    assert_eq!(ctx.regs.ccr.bits(), 0);
}

#[test]
fn divu_overflow_leaves_destination() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x80FC, 0x0001]); // divu #1,d0
    ctx.regs.d[0] = 0x0001_0000;
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.d[0], 0x0001_0000);
    assert!(ctx.regs.ccr.v());
    assert!(!ctx.regs.ccr.c());
}

#[test]
fn divs_negative_dividend() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x81FC, 0x0007]); // divs #7,d0
    ctx.regs.d[0] = (-100i32) as u32;
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.d[0], 0xFFFE_FFF2);
    assert!(ctx.regs.ccr.n());
}

#[test]
fn muls_signed_product() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0xC1FC, 0xFFFE]); // muls #-2,d0
    ctx.regs.d[0] = 3;
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.d[0], 0xFFFF_FFFA);
    assert!(ctx.regs.ccr.n());
}

#[test]
fn move_to_sr_in_user_mode_is_privileged() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x46FC, 0x2700]); // move #$2700,sr
    ctx.set_sr(0x0000);
    let e = cpu.step(ORG, &mut ctx).unwrap_err();
    assert_eq!(e.kind, ExceptionKind::PrivilegeViolation);
    assert_eq!(e.return_pc, ORG);
    assert_eq!(ctx.sr(), 0x0000);
}

#[test]
fn move_from_sr_is_allowed_in_user_mode() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x40C0]); // move sr,d0
    ctx.set_sr(0x0015);
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.d[0], 0x0015);
}

#[test]
fn lea_leaves_flags_alone() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x43E8, 0x0010]); // lea $10(a0),a1
    ctx.regs.a[0] = 0x2000;
    ctx.regs.ccr.set_bits(0x1F);
    assert_eq!(step(&cpu, &mut ctx, ORG), ORG + 4);
    assert_eq!(ctx.regs.a[1], 0x2010);
    assert_eq!(ctx.regs.ccr.bits(), 0x1F);
}

#[test]
fn address_register_and_flow_instructions_keep_flags() {
    let cases: [(&str, &[u16]); 16] = [
        ("movea.l d0,a1", &[0x2240]),
        ("movea.w #-1,a1", &[0x327C, 0xFFFF]),
        ("adda.l d0,a0", &[0xD1C0]),
        ("suba.w d0,a0", &[0x90C0]),
        ("addq.l #8,a0", &[0x5088]),
        ("subq.w #1,a0", &[0x5348]),
        ("exg d0,a0", &[0xC188]),
        ("move a0,usp", &[0x4E60]),
        ("move usp,a1", &[0x4E69]),
        ("jmp (a0)", &[0x4ED0]),
        ("jsr (a0)", &[0x4E90]),
        ("rts", &[0x4E75]),
        ("pea (a0)", &[0x4850]),
        ("pea $10(a0)", &[0x4868, 0x0010]),
        ("lea (a0),a1", &[0x43D0]),
        ("bra.s *+4", &[0x6002]),
    ];
    let cpu = Processor::new();
    for (text, program) in cases {
        for bits in [0x1F, 0x00] {
            let mut ctx = machine(program);
            ctx.regs.d[0] = 0x8000_0004;
            ctx.regs.a[0] = 0x2000;
            ctx.write(Size::Long, STACK, ORG).unwrap();
            ctx.regs.ccr.set_bits(bits);
            step(&cpu, &mut ctx, ORG);
            assert_eq!(ctx.regs.ccr.bits(), bits, "{text} with ccr {bits:#04x}");
        }
    }
}

#[test]
fn branch_backwards_from_zero_wraps_the_program_counter() {
    let cpu = Processor::new();
    let mut ctx = machine(&[]);
    let top = shared(Memory::ram(0xFF_0000, 0x1_0000));
    ctx.bus_mut().map(FC_ALL, 0xFF_0000, 0x1_0000, top);
    load_words(&mut ctx, 0, &[0x60FA, 0x60FA]); // bra.s *-4 ; bra.s *-4
    // move.w #$1234,d0 ; nop
    load_words(&mut ctx, 0xFFFF_FFFC, &[0x303C, 0x1234]);

    assert_eq!(step(&cpu, &mut ctx, 0), 0xFFFF_FFFC);
    assert_eq!(step(&cpu, &mut ctx, 0xFFFF_FFFC), 0);
    assert_eq!(ctx.regs.d[0], 0x1234);

    load_words(&mut ctx, 0xFFFF_FFFE, &[0x4E71]);
    assert_eq!(step(&cpu, &mut ctx, 2), 0xFFFF_FFFE);
    assert_eq!(step(&cpu, &mut ctx, 0xFFFF_FFFE), 0);
}

#[test]
fn move_same_postincrement_register_on_both_sides() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x30D8]); // move.w (a0)+,(a0)+
    ctx.regs.a[0] = 0x2000;
    ctx.write(Size::Word, 0x2000, 0x8111).unwrap();
    ctx.write(Size::Word, 0x2002, 0x2222).unwrap();
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.a[0], 0x2004);
    assert_eq!(ctx.read(Size::Word, 0x2000), Ok(0x8111));
    assert_eq!(ctx.read(Size::Word, 0x2002), Ok(0x2222));
    assert!(ctx.regs.ccr.n());
}

#[test]
fn movem_push_and_pop() {
    let cpu = Processor::new();
    let mut ctx = machine(&[
        0x48E7, 0xC080, // movem.l d0-d1/a0,-(a7)
        0x4CDF, 0x020C, // movem.l (a7)+,d2-d3/a1
    ]);
    ctx.regs.d[0] = 0x1111_1111;
    ctx.regs.d[1] = 0x2222_2222;
    ctx.regs.a[0] = 0x3333_3333;
    let pc = step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.a[7], STACK - 12);
    assert_eq!(ctx.read(Size::Long, STACK - 12), Ok(0x1111_1111));
    assert_eq!(ctx.read(Size::Long, STACK - 8), Ok(0x2222_2222));
    assert_eq!(ctx.read(Size::Long, STACK - 4), Ok(0x3333_3333));

    assert_eq!(step(&cpu, &mut ctx, pc), ORG + 8);
    assert_eq!(ctx.regs.d[2], 0x1111_1111);
    assert_eq!(ctx.regs.d[3], 0x2222_2222);
    assert_eq!(ctx.regs.a[1], 0x3333_3333);
    assert_eq!(ctx.regs.a[7], STACK);
}

#[test]
fn subroutine_call_and_return() {
    let cpu = Processor::new();
    let mut ctx = machine(&[
        0x6104, // bsr.s sub
        0x4E72, 0x2700, // stop #$2700
        0x7009, // sub: moveq #9,d0
        0x4E75, // rts
    ]);
    assert_eq!(cpu.run(ORG, &mut ctx), Ok(ORG + 6));
    assert_eq!(ctx.regs.d[0], 9);
    assert_eq!(ctx.regs.a[7], STACK);
}

#[test]
fn branch_not_taken_skips_word_displacement() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x6700, 0x0100]); // beq.w *+$102
    ctx.regs.ccr.set_bits(0);
    assert_eq!(step(&cpu, &mut ctx, ORG), ORG + 4);
    ctx.regs.ccr.set_bits(0x04);
    assert_eq!(step(&cpu, &mut ctx, ORG), ORG + 2 + 0x100);
}

#[test]
fn compare_leaves_extend() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0xB001]); // cmp.b d1,d0
    ctx.regs.d[1] = 1;
    ctx.regs.ccr.set_bits(0x10);
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.ccr.bits(), 0x19);

    ctx.regs.ccr.set_bits(0);
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.ccr.bits(), 0x09);
}

#[test]
fn addx_only_clears_zero() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0xD181]); // addx.l d1,d0
    ctx.regs.ccr.set_bits(0x04);
    step(&cpu, &mut ctx, ORG);
    assert!(ctx.regs.ccr.z());

    ctx.regs.d[1] = 1;
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.d[0], 1);
    assert!(!ctx.regs.ccr.z());
}

#[test]
fn addx_predecrement_form() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0xD308]); // addx.b -(a0),-(a1)
    ctx.regs.a[0] = 0x2001;
    ctx.regs.a[1] = 0x3001;
    ctx.write(Size::Byte, 0x2000, 0x80).unwrap();
    ctx.write(Size::Byte, 0x3000, 0x80).unwrap();
    ctx.regs.ccr.set_bits(0x14);
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.read(Size::Byte, 0x3000), Ok(0x01));
    assert_eq!((ctx.regs.a[0], ctx.regs.a[1]), (0x2000, 0x3000));
    let cc = ctx.regs.ccr;
    assert!(cc.c() && cc.x() && cc.v() && !cc.z());
}

#[test]
fn shifts_through_the_table() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0xE348, 0xE3B8]); // lsl.w #1,d0 ; rol.l d1,d0
    ctx.regs.d[0] = 0x0000_8001;
    let pc = step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.d[0], 0x0000_0002);
    assert!(ctx.regs.ccr.c() && ctx.regs.ccr.x());

    ctx.regs.d[0] = 0x1234_5678;
    ctx.regs.d[1] = 4;
    step(&cpu, &mut ctx, pc);
    assert_eq!(ctx.regs.d[0], 0x2345_6781);
    assert!(ctx.regs.ccr.c());
}

#[test]
fn register_shift_by_zero_keeps_carry() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0xE3A8]); // lsl.l d1,d0
    ctx.regs.d[0] = 0x8000_0000;
    ctx.regs.ccr.set_bits(0x03);
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.d[0], 0x8000_0000);
    assert_eq!(ctx.regs.ccr.bits(), 0x09);
}

#[test]
fn memory_shift_is_one_word() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0xE0D0]); // asr.w (a0)
    ctx.regs.a[0] = 0x2000;
    ctx.write(Size::Word, 0x2000, 0x8001).unwrap();
    assert_eq!(step(&cpu, &mut ctx, ORG), ORG + 2);
    assert_eq!(ctx.read(Size::Word, 0x2000), Ok(0xC000));
    assert!(ctx.regs.ccr.c() && ctx.regs.ccr.n());
}

#[test]
fn swap_and_extend() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x4840, 0x4881, 0x48C2]); // swap d0 ; ext.w d1 ; ext.l d2
    ctx.regs.d[0] = 0x1234_5678;
    ctx.regs.d[1] = 0x0000_0080;
    ctx.regs.d[2] = 0x0000_8000;
    let mut pc = ORG;
    for _ in 0..3 {
        pc = step(&cpu, &mut ctx, pc);
    }
    assert_eq!(ctx.regs.d[0], 0x5678_1234);
    assert_eq!(ctx.regs.d[1], 0x0000_FF80);
    assert_eq!(ctx.regs.d[2], 0xFFFF_8000);
    assert!(ctx.regs.ccr.n());
}

#[test]
fn exchange_registers() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0xC188]); // exg d0,a0
    ctx.regs.d[0] = 1;
    ctx.regs.a[0] = 2;
    step(&cpu, &mut ctx, ORG);
    assert_eq!((ctx.regs.d[0], ctx.regs.a[0]), (2, 1));
}

#[test]
fn chk_bounds() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x41BC, 0x000A]); // chk #10,d0
    ctx.regs.d[0] = 5;
    assert_eq!(step(&cpu, &mut ctx, ORG), ORG + 4);

    ctx.regs.d[0] = 11;
    let e = cpu.step(ORG, &mut ctx).unwrap_err();
    assert_eq!(e.kind, ExceptionKind::Chk);
    assert!(!ctx.regs.ccr.n());

    ctx.regs.d[0] = 0xFFFF;
    let e = cpu.step(ORG, &mut ctx).unwrap_err();
    assert_eq!(e.return_pc, ORG + 4);
    assert!(ctx.regs.ccr.n());
}

#[test]
fn set_on_condition() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x57C0]); // seq d0
    ctx.regs.d[0] = 0x1234_5600;
    ctx.regs.ccr.set_bits(0x04);
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.d[0], 0x1234_56FF);
}

#[test]
fn bit_operations() {
    let cpu = Processor::new();
    let mut ctx = machine(&[
        0x0800, 0x0003, // btst #3,d0
        0x03D0, // bset d1,(a0)
    ]);
    ctx.regs.d[0] = 8;
    ctx.regs.d[1] = 9;
    ctx.regs.a[0] = 0x2000;
    let pc = step(&cpu, &mut ctx, ORG);
    assert!(!ctx.regs.ccr.z());

    step(&cpu, &mut ctx, pc);
    assert_eq!(ctx.read(Size::Byte, 0x2000), Ok(0x02));
    assert!(ctx.regs.ccr.z());
}

#[test]
fn addq_to_address_register_is_long_and_flagless() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x5248]); // addq.w #1,a0
    ctx.regs.a[0] = 0xFFFF;
    ctx.regs.ccr.set_bits(0x04);
    step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.a[0], 0x1_0000);
    assert_eq!(ctx.regs.ccr.bits(), 0x04);
}

#[test]
fn movep_alternate_bytes() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x0188, 0x0000, 0x0308, 0x0000]); // movep.w d0,0(a0) ; movep.w 0(a0),d1
    ctx.regs.d[0] = 0x1234;
    ctx.regs.a[0] = 0x2000;
    let pc = step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.read(Size::Byte, 0x2000), Ok(0x12));
    assert_eq!(ctx.read(Size::Byte, 0x2001), Ok(0));
    assert_eq!(ctx.read(Size::Byte, 0x2002), Ok(0x34));
    step(&cpu, &mut ctx, pc);
    assert_eq!(ctx.regs.d[1], 0x1234);
}

#[test]
fn link_and_unlink() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x4E56, 0xFFF8, 0x4E5E]); // link a6,#-8 ; unlk a6
    ctx.regs.a[6] = 0x1111;
    let pc = step(&cpu, &mut ctx, ORG);
    assert_eq!(ctx.regs.a[6], STACK - 4);
    assert_eq!(ctx.regs.a[7], STACK - 12);
    assert_eq!(ctx.read(Size::Long, STACK - 4), Ok(0x1111));
    step(&cpu, &mut ctx, pc);
    assert_eq!(ctx.regs.a[6], 0x1111);
    assert_eq!(ctx.regs.a[7], STACK);
}

#[test]
fn test_and_set() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x4AD0]); // tas (a0)
    ctx.regs.a[0] = 0x2000;
    step(&cpu, &mut ctx, ORG);
    assert!(ctx.regs.ccr.z());
    assert_eq!(ctx.read(Size::Byte, 0x2000), Ok(0x80));
}

#[test]
fn odd_word_read_is_an_address_error() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x3010]); // move.w (a0),d0
    ctx.regs.a[0] = 0x2001;
    let e = cpu.step(ORG, &mut ctx).unwrap_err();
    match e.kind {
        ExceptionKind::AddressError(info) => assert_eq!(info.address, 0x2001),
        other => panic!("expected address error, got {other}"),
    }
    assert_eq!(e.opcode, 0x3010);
}

#[test]
fn trap_resumes_after_the_instruction() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x4E43]); // trap #3
    let e = cpu.step(ORG, &mut ctx).unwrap_err();
    assert_eq!(e.kind, ExceptionKind::Trap(3));
    assert_eq!(e.vector(), 35);
    assert_eq!(e.return_pc, ORG + 2);
}

#[test]
fn illegal_and_line_traps() {
    let cpu = Processor::new();
    let mut ctx = machine(&[0x4AFC, 0xA123, 0xF000]);
    for (pc, kind) in [
        (ORG, ExceptionKind::IllegalInstruction),
        (ORG + 2, ExceptionKind::LineA),
        (ORG + 4, ExceptionKind::LineF),
    ] {
        let e = cpu.step(pc, &mut ctx).unwrap_err();
        assert_eq!(e.kind, kind);
        assert_eq!(e.return_pc, pc);
    }
}
