// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[cfg(test)]
mod integration_tests {
    use crate::bus::SystemBus;
    use crate::cpu::{Arm7Tdmi, Mode};
    use crate::memory::{ProgramImage, SeedPolicy};
    use crate::metrics::PerformanceMetrics;
    use crate::snapshot::{CpuSnapshot, MachineSnapshot};
    use crate::{
        Bus, DebugControl, Machine, SimulationConfig, SimulationError, StopReason,
        UnimplementedPolicy,
    };
    use std::sync::Arc;

    const BIOS_LEN: usize = 16 * 1024;
    const IWRAM: u32 = 0x0300_0000;

    fn create_machine() -> Machine<Arm7Tdmi> {
        Machine::new(Arm7Tdmi::new(), SystemBus::gba())
    }

    fn bios(words: &[u32]) -> Vec<u8> {
        let mut data = vec![0u8; BIOS_LEN];
        for (i, w) in words.iter().enumerate() {
            data[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
        }
        data
    }

    fn machine_with_bios(words: &[u32]) -> Machine<Arm7Tdmi> {
        let mut machine = create_machine();
        let mut image = ProgramImage::new(0);
        image.add_segment(0, bios(words), SeedPolicy::Exact);
        machine.load_image(&image).unwrap();
        machine
    }

    #[test]
    fn test_load_image_runs_bios() {
        let mut machine = machine_with_bios(&[
            0xE3A0_0001, // MOV r0, #1
            0xE280_0001, // ADD r0, r0, #1
            0xEAFF_FFFE, // B .
        ]);

        let res = machine.run(Some(10)).unwrap();
        assert_eq!(res, StopReason::MaxStepsReached);
        assert_eq!(machine.cpu.reg(0), 2);
        assert_eq!(machine.get_step_count(), 10);
        assert_eq!(machine.cpu.mode(), Mode::Svc);
    }

    #[test]
    fn test_load_image_rejects_short_bios() {
        let mut machine = create_machine();
        let mut image = ProgramImage::new(0);
        image.add_segment(0, vec![0; 4], SeedPolicy::Exact);
        let err = machine.load_image(&image).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::SeedLengthMismatch {
                expected: BIOS_LEN,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_cartridge_entry_point() {
        let mut machine = create_machine();
        let mut image = ProgramImage::new(0x0800_0000);
        image.add_segment(
            0x0800_0000,
            0xE3A0_1005u32.to_le_bytes().to_vec(), // MOV r1, #5
            SeedPolicy::Pad,
        );
        machine.load_image(&image).unwrap();
        assert_eq!(machine.get_pc(), 0x0800_0000);

        machine.step().unwrap();
        machine.step().unwrap();
        assert_eq!(machine.cpu.reg(1), 5);
        // Padding reads as zero
        assert_eq!(machine.bus.read_u32(0x0800_0004).unwrap(), 0);
    }

    #[test]
    fn test_breakpoint_matches_fetch_address() {
        let mut machine = machine_with_bios(&[
            0xE3A0_0001, // MOV r0, #1
            0xE3A0_1002, // MOV r1, #2
            0xE3A0_2003, // MOV r2, #3
            0xEAFF_FFFE, // B .
        ]);
        machine.add_breakpoint(8);

        let res = machine.run(Some(100)).unwrap();
        assert!(matches!(res, StopReason::Breakpoint(addr) if addr == 8));
        assert_eq!(machine.cpu.reg(0), 1);
        assert_eq!(machine.cpu.reg(1), 0);

        // Resuming steps over the breakpoint
        let res = machine.run(Some(1)).unwrap();
        assert_eq!(res, StopReason::MaxStepsReached);
        assert_eq!(machine.get_pc(), 12);
        assert_eq!(machine.cpu.reg(1), 2);

        machine.clear_breakpoints();
        assert_eq!(machine.run(Some(20)).unwrap(), StopReason::MaxStepsReached);
    }

    #[test]
    fn test_fault_propagates_from_run() {
        let program = [0xE8BD_000F]; // LDMIA sp!, {r0-r3}
        let mut machine = machine_with_bios(&program);
        let err = machine.run(Some(10)).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Unimplemented { pc: 0, .. }
        ));

        let mut machine = machine_with_bios(&program).with_config(SimulationConfig {
            unimplemented: UnimplementedPolicy::Skip,
        });
        assert_eq!(machine.run(Some(3)).unwrap(), StopReason::MaxStepsReached);
    }

    #[test]
    fn test_metrics_collection() {
        let mut machine = machine_with_bios(&[
            0xE350_0001, // CMP r0, #1
            0x03A0_1001, // MOVEQ r1, #1 (condition fails)
            0xEAFF_FFFE, // B .
        ]);
        let metrics = Arc::new(PerformanceMetrics::new());
        machine.observers.push(metrics.clone());

        machine.run(Some(6)).unwrap();
        assert_eq!(metrics.get_steps(), 6);
        assert_eq!(metrics.get_instructions(), 3);
        assert_eq!(metrics.get_condition_failed(), 1);
        assert_eq!(metrics.get_flushes(), 2);
        assert_eq!(machine.cpu.reg(1), 0);

        metrics.reset();
        assert_eq!(metrics.get_instructions(), 0);
    }

    #[test]
    fn test_state_snapshot() {
        let program = [
            0xE3A0_0001, // MOV r0, #1
            0xE280_0001, // ADD r0, r0, #1
            0xE280_0001, // ADD r0, r0, #1
            0xEAFF_FFFE, // B .
        ];
        let mut machine = machine_with_bios(&program);
        machine.run(Some(2)).unwrap();

        let snap = machine.snapshot();
        let CpuSnapshot::Arm7Tdmi(s) = &snap.cpu;
        assert_eq!(s.registers[0], 1);
        assert_eq!(s.registers[15], 8);
        assert_eq!(s.pipeline, Some(0xE280_0001));
        assert_eq!(snap.steps, 2);

        let json_str = snap.to_json().unwrap();
        let restored = MachineSnapshot::from_json(&json_str).unwrap();

        let mut other = machine_with_bios(&program);
        other.apply_snapshot(&restored);
        assert_eq!(other.get_step_count(), 2);

        machine.run(Some(2)).unwrap();
        other.run(Some(2)).unwrap();
        assert_eq!(other.cpu.reg(0), 3);
        assert_eq!(other.cpu.reg(0), machine.cpu.reg(0));
        assert_eq!(other.get_pc(), machine.get_pc());
    }

    #[test]
    fn test_debug_register_and_memory_access() {
        let mut machine = create_machine();
        assert_eq!(machine.get_register_names().len(), 17);

        machine.write_core_reg(16, Mode::Sys as u32);
        assert_eq!(machine.read_core_reg(16) & 0x1F, 0x1F);
        assert_eq!(machine.cpu.mode(), Mode::Sys);

        // An invalid mode is ignored
        machine.write_core_reg(16, 0x05);
        assert_eq!(machine.cpu.mode(), Mode::Sys);

        machine.write_core_reg(3, 0xDEAD_BEEF);
        assert_eq!(machine.read_core_reg(3), 0xDEAD_BEEF);

        machine.write_memory(IWRAM, &[1, 2, 3, 4]).unwrap();
        assert_eq!(machine.read_memory(IWRAM, 4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(machine.bus.read_u32(IWRAM).unwrap(), 0x0403_0201);

        let err = machine.read_memory(0x1000_0000, 1).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::MemoryViolation {
                addr: 0x1000_0000,
                len: 1
            }
        ));
    }

    #[test]
    fn test_arm_to_thumb_interworking() {
        let mut machine = machine_with_bios(&[
            0xE28F_0001, // ADD r0, pc, #1 -> 9
            0xE12F_FF10, // BX r0
            0xE7FE_2107, // THUMB: MOV r1, #7 ; B .
        ]);

        machine.run(Some(8)).unwrap();
        assert!(machine.cpu.thumb());
        assert_eq!(machine.cpu.reg(0), 9);
        assert_eq!(machine.cpu.reg(1), 7);
        assert_eq!(machine.get_pc(), 10);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut machine = machine_with_bios(&[0xE3A0_0001]);
        machine.run(Some(2)).unwrap();
        assert_eq!(machine.cpu.reg(0), 1);

        DebugControl::reset(&mut machine).unwrap();
        assert_eq!(machine.cpu.reg(0), 0);
        assert_eq!(machine.get_pc(), 0);
        assert_eq!(machine.get_step_count(), 0);
        assert_eq!(machine.cpu.pending(), None);
        // Memory survives a CPU reset
        assert_eq!(machine.bus.read_u32(0).unwrap(), 0xE3A0_0001);
    }
}
