use crate::modem::sstv::modes::VisCode;

/// Progress of [`SstvDecoder`](super::SstvDecoder) through a transmission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecoderState {
    #[default]
    SearchingHeader,
    HeaderFound {
        vis_code: VisCode,
    },
    DecodingLine {
        y: usize,
        num_lines: usize,
    },
    Complete,
    Truncated {
        lines: usize,
    },
    UnsupportedMode {
        vis_code: VisCode,
    },
    HeaderNotFound,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderEvent {
    HeaderDecoded { vis_code: VisCode },
    HeaderMissing,
    ModeSelected { num_lines: usize },
    ModeRejected,
    LineDecoded,
    EndOfStream,
}

impl DecoderState {
    /// Transition on `event`. Events that don't apply to the current state
    /// leave it unchanged.
    pub fn next(self, event: DecoderEvent) -> Self {
        match (self, event) {
            (Self::SearchingHeader, DecoderEvent::HeaderDecoded { vis_code }) => {
                Self::HeaderFound { vis_code }
            }
            (Self::SearchingHeader, DecoderEvent::HeaderMissing) => Self::HeaderNotFound,
            (Self::HeaderFound { .. }, DecoderEvent::ModeSelected { num_lines: 0 }) => {
                Self::Complete
            }
            (Self::HeaderFound { .. }, DecoderEvent::ModeSelected { num_lines }) => {
                Self::DecodingLine { y: 0, num_lines }
            }
            (Self::HeaderFound { vis_code }, DecoderEvent::ModeRejected) => {
                Self::UnsupportedMode { vis_code }
            }
            (Self::DecodingLine { y, num_lines }, DecoderEvent::LineDecoded) => {
                if y + 1 == num_lines {
                    Self::Complete
                }
                else {
                    Self::DecodingLine {
                        y: y + 1,
                        num_lines,
                    }
                }
            }
            (Self::DecodingLine { y, .. }, DecoderEvent::EndOfStream) => Self::Truncated { lines: y },
            (state, _) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete
                | Self::Truncated { .. }
                | Self::UnsupportedMode { .. }
                | Self::HeaderNotFound
        )
    }
}
