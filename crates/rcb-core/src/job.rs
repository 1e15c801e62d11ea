use crate::{attachments::NormalizedImage, messaging::types::InboundMessage};

/// One primitive printer operation.
#[derive(Clone, Debug)]
pub enum PrintOp {
    SetStyle { inverted: bool },
    WriteText(String),
    WriteImage(NormalizedImage),
    FeedLine,
}

/// Ordered command sequence for one message.
#[derive(Clone, Debug, Default)]
pub struct PrintJob {
    ops: Vec<PrintOp>,
}

impl PrintJob {
    /// Compose the job for an admitted message.
    ///
    /// Layout: `[invert on] "<author>: " [text\n] [invert off] images... feed`.
    pub fn for_message(msg: &InboundMessage, inverted: bool, images: Vec<NormalizedImage>) -> Self {
        let mut ops = Vec::with_capacity(images.len() + 5);

        if inverted {
            ops.push(PrintOp::SetStyle { inverted: true });
        }
        ops.push(PrintOp::WriteText(format!("{}: ", msg.author)));
        if msg.has_text() {
            ops.push(PrintOp::WriteText(format!("{}\n", msg.text)));
        }
        if inverted {
            ops.push(PrintOp::SetStyle { inverted: false });
        }
        ops.extend(images.into_iter().map(PrintOp::WriteImage));
        ops.push(PrintOp::FeedLine);

        Self { ops }
    }

    pub fn ops(&self) -> &[PrintOp] {
        &self.ops
    }

    pub fn image_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, PrintOp::WriteImage(_)))
            .count()
    }
}
