//! Frame pipeline task.
//!
//! Background thread that turns each captured legacy frame into a displayed
//! one: run the accelerator command list that rotates and scales the capture
//! texture, copy the result into the top screen's back framebuffer and swap.
//!
//! The task owns the accelerator, the display and its own input handle, so
//! nothing else writes to them while it runs. It exits when the frame-ready
//! event is destroyed.

use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, trace, warn};

use super::dump::dump_frame_texture;
use super::event::FrameConsumer;
use crate::error::Result;
use crate::hal::{Accelerator, Display, DisplayTransfer, Input, Keys, Screen, TransferDims};

/// Accelerator render target holding the rotated frame.
pub const RENDER_TARGET_ADDR: u32 = 0x1818_0000;

/// Rows skipped at the top of both surfaces (16 rows of 240 RGB8 pixels).
pub const FRAME_ROW_OFFSET: u32 = 16 * 240 * 3;

/// Area copied per frame.
pub const FRAME_DIMS: TransferDims = TransferDims::new(240, 368);

/// Transfer flags: 24-bit input and output format.
pub const FRAME_TRANSFER_FLAGS: u32 = 1 << 12 | 1 << 8;

const THREAD_NAME: &str = "frame-pipeline";

/// Opaque accelerator command lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameLists {
    /// Submitted for the first frame only; sets up accelerator state.
    pub init: Vec<u32>,
    /// Submitted for every later frame.
    pub steady: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Steady,
}

/// Devices moved into the task.
pub struct PipelineDevices {
    pub accelerator: Box<dyn Accelerator>,
    pub display: Box<dyn Display>,
    pub input: Box<dyn Input>,
}

pub struct FramePipeline {
    consumer: FrameConsumer,
    devices: PipelineDevices,
    lists: FrameLists,
    state: PipelineState,
    dump_dir: PathBuf,
    frames: u64,
}

impl FramePipeline {
    /// `dump_dir` receives `texture_dump.bmp` when Y is pressed.
    pub fn new(
        consumer: FrameConsumer,
        devices: PipelineDevices,
        lists: FrameLists,
        dump_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            consumer,
            devices,
            lists,
            state: PipelineState::Uninitialized,
            dump_dir: dump_dir.into(),
            frames: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Start the task on its own named thread.
    pub fn spawn(self) -> Result<FramePipelineHandle> {
        let handle = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                let mut pipeline = self;
                pipeline.run()
            })?;

        Ok(FramePipelineHandle {
            handle: Some(handle),
        })
    }

    /// Process frames until the event is closed. Returns the frame count.
    fn run(&mut self) -> u64 {
        debug!("Frame pipeline started");
        while self.consumer.wait().is_ok() {
            self.present_frame();
            self.consumer.clear();
            self.maybe_dump();
        }
        info!("Frame pipeline finished after {} frames", self.frames);
        self.frames
    }

    /// Convert and present one captured frame.
    fn present_frame(&mut self) {
        let list = match self.state {
            PipelineState::Uninitialized => {
                self.state = PipelineState::Steady;
                &self.lists.init
            }
            PipelineState::Steady => &self.lists.steady,
        };

        let accel = &mut self.devices.accelerator;
        accel.process_command_list(list);
        accel.wait_for_3d();

        let back = self.devices.display.back_framebuffer(Screen::Top);
        accel.display_transfer(&DisplayTransfer {
            src: RENDER_TARGET_ADDR + FRAME_ROW_OFFSET,
            src_dims: FRAME_DIMS,
            dst: back + FRAME_ROW_OFFSET,
            dst_dims: FRAME_DIMS,
            flags: FRAME_TRANSFER_FLAGS,
        });
        accel.wait_for_transfer();
        self.devices.display.swap_framebuffers();

        self.frames += 1;
        trace!("Presented frame {}", self.frames);
    }

    fn maybe_dump(&mut self) {
        self.devices.input.scan();
        if !self.devices.input.keys_down().contains(Keys::Y) {
            return;
        }
        if let Err(e) = dump_frame_texture(self.devices.accelerator.as_mut(), &self.dump_dir) {
            warn!("Texture dump failed: {}", e);
        }
    }
}

/// Join handle of the pipeline thread.
///
/// Dropping it joins the thread, so the frame-ready event must be destroyed
/// first or the drop blocks forever.
pub struct FramePipelineHandle {
    handle: Option<JoinHandle<u64>>,
}

impl FramePipelineHandle {
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Wait for the task to exit and return how many frames it presented.
    pub fn join(mut self) -> u64 {
        self.join_inner()
    }

    fn join_inner(&mut self) -> u64 {
        let Some(handle) = self.handle.take() else {
            return 0;
        };
        handle.join().unwrap_or_else(|_| {
            warn!("Frame pipeline thread panicked");
            0
        })
    }
}

impl Drop for FramePipelineHandle {
    fn drop(&mut self) {
        self.join_inner();
    }
}
