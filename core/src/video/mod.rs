//! Frame presentation: gamma table, frame-ready event and the pipeline task.

mod dump;
mod event;
mod gamma;
mod pipeline;

pub use dump::{TEXTURE_DUMP_FILE, dump_frame_texture, write_bmp_header};
pub use event::{EventClosed, FrameConsumer, FramePacer, FrameReadyEvent, FrameSignal};
pub use gamma::{GAMMA_TABLE_LEN, GammaTable};
pub use pipeline::{
    FRAME_DIMS, FRAME_ROW_OFFSET, FRAME_TRANSFER_FLAGS, FrameLists, FramePipeline,
    FramePipelineHandle, PipelineDevices, PipelineState, RENDER_TARGET_ADDR,
};
