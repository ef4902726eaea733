//! Save-state serialization for the DSP interface.
//!
//! The ARAM image is included only when the device owns it; in unified-memory
//! mode the pool's owner serializes those bytes. A snapshot taken in one mode
//! cannot be restored in the other.

use flipper_io_snapshot::codec::{Decoder, Encoder};
use flipper_io_snapshot::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};

use crate::dma::{AramDma, AudioDma};
use crate::interface::{DspIo, SnapshotState};

const TAG_ARAM: u16 = 1;
const TAG_CONTROL: u16 = 2;
const TAG_AUDIO_DMA: u16 = 3;
const TAG_ARAM_DMA: u16 = 4;
const TAG_ARAM_INFO: u16 = 5;
const TAG_ARAM_MODE: u16 = 6;
const TAG_ARAM_REFRESH: u16 = 7;
const TAG_DSP_SLICE: u16 = 8;
const TAG_CORE: u16 = 9;

fn require<T>(field: SnapshotResult<Option<T>>, tag: u16) -> SnapshotResult<T> {
    field?.ok_or(SnapshotError::MissingField { tag })
}

impl IoSnapshot for DspIo {
    const DEVICE_ID: [u8; 4] = *b"FDSP";
    const DEVICE_VERSION: SnapshotVersion = SnapshotVersion::new(1, 0);

    fn save_state(&self) -> Vec<u8> {
        let s = self.state_for_snapshot();
        let mut w = SnapshotWriter::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        if let Some(bytes) = self.aram.snapshot_bytes() {
            w.field_bytes(TAG_ARAM, bytes);
        }
        w.field_u16(TAG_CONTROL, s.control);
        w.field_bytes(
            TAG_AUDIO_DMA,
            Encoder::new()
                .u32(s.audio_dma.source_address)
                .u32(s.audio_dma.current_source_address)
                .u16(s.audio_dma.remaining_blocks)
                .u16(s.audio_dma.control)
                .finish(),
        );
        w.field_bytes(
            TAG_ARAM_DMA,
            Encoder::new()
                .u32(s.aram_dma.main_addr)
                .u32(s.aram_dma.aram_addr)
                .u32(s.aram_dma.count)
                .finish(),
        );
        w.field_u16(TAG_ARAM_INFO, s.aram_info);
        w.field_u16(TAG_ARAM_MODE, s.aram_mode);
        w.field_u16(TAG_ARAM_REFRESH, s.aram_refresh);
        w.field_u32(TAG_DSP_SLICE, s.slice_cycles);
        w.field_bytes(TAG_CORE, self.core.save_state());
        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let r = SnapshotReader::parse(bytes, Self::DEVICE_ID)?;
        r.ensure_device_major(Self::DEVICE_VERSION.major)?;

        match (r.bytes(TAG_ARAM), self.aram.is_unified()) {
            (Some(image), false) => self
                .aram
                .restore_bytes(image)
                .map_err(|()| SnapshotError::Corrupt("ARAM image size mismatch"))?,
            (None, true) => {}
            (Some(_), true) => {
                return Err(SnapshotError::Corrupt(
                    "snapshot carries an ARAM image but the live store is unified",
                ));
            }
            (None, false) => {
                return Err(SnapshotError::MissingField { tag: TAG_ARAM });
            }
        }

        let audio_blob = r
            .bytes(TAG_AUDIO_DMA)
            .ok_or(SnapshotError::MissingField { tag: TAG_AUDIO_DMA })?;
        let mut d = Decoder::new(audio_blob);
        let audio_dma = AudioDma {
            source_address: d.u32()?,
            current_source_address: d.u32()?,
            remaining_blocks: d.u16()?,
            control: d.u16()?,
        };
        d.finish()?;

        let aram_blob = r
            .bytes(TAG_ARAM_DMA)
            .ok_or(SnapshotError::MissingField { tag: TAG_ARAM_DMA })?;
        let mut d = Decoder::new(aram_blob);
        let aram_dma = AramDma {
            main_addr: d.u32()?,
            aram_addr: d.u32()?,
            count: d.u32()?,
        };
        d.finish()?;

        let state = SnapshotState {
            control: require(r.u16(TAG_CONTROL), TAG_CONTROL)?,
            audio_dma,
            aram_dma,
            aram_info: require(r.u16(TAG_ARAM_INFO), TAG_ARAM_INFO)?,
            aram_mode: require(r.u16(TAG_ARAM_MODE), TAG_ARAM_MODE)?,
            aram_refresh: require(r.u16(TAG_ARAM_REFRESH), TAG_ARAM_REFRESH)?,
            slice_cycles: require(r.u32(TAG_DSP_SLICE), TAG_DSP_SLICE)?,
        };
        let core_blob = r
            .bytes(TAG_CORE)
            .ok_or(SnapshotError::MissingField { tag: TAG_CORE })?;
        self.core.load_state(core_blob)?;
        self.apply_snapshot_state(state);
        // Deliberately not re-driving the interrupt line here; the host
        // calls `sync_interrupt_line` once every device is restored.
        Ok(())
    }
}
