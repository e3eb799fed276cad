//! Convenience mass-import of all blocks.
pub use crate::access_code_tagger::AccessCodeTagger;
pub use crate::binary_slicer::BinarySlicer;
pub use crate::debug_sink::DebugSink;
pub use crate::decode::AisDecoder;
pub use crate::deframer::AisDeframer;
pub use crate::file_source::FileSource;
pub use crate::lms_dfe::LmsDfe;
pub use crate::message_sink::MessageSink;
pub use crate::nrzi::NrziDecode;
pub use crate::preamble_flags::PreambleFlags;
pub use crate::tee::Tee;
pub use crate::unstuff::BitUnstuff;
pub use crate::vector_source::VectorSource;
