//! Remonta frames terminados em `\n` a partir de leituras de tamanho
//! arbitrário da porta serial.

use tracing::warn;

/// Tamanho máximo de uma linha antes de ser descartada como lixo.
pub const MAX_LINE: usize = 256;

#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_LINE),
        }
    }

    /// Acrescenta bytes e devolve as linhas completas (incluindo o `\n`).
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();

        for &b in bytes {
            self.buffer.push(b);
            if b == b'\n' {
                lines.push(std::mem::take(&mut self.buffer));
            } else if self.buffer.len() > MAX_LINE {
                warn!("Linha sem terminador com mais de {MAX_LINE} bytes, descartando");
                self.buffer.clear();
            }
        }

        lines
    }

    /// Bytes aguardando o terminador.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_split_across_reads() {
        let mut asm = FrameAssembler::new();
        assert!(asm.push(b"ST,NT,+  ").is_empty());
        assert!(asm.push(b" 12.3kg\r").is_empty());
        let lines = asm.push(b"\nST,");
        assert_eq!(lines, vec![b"ST,NT,+   12.3kg\r\n".to_vec()]);
        assert_eq!(asm.pending(), 3);
    }

    #[test]
    fn several_frames_in_one_read() {
        let mut asm = FrameAssembler::new();
        let lines = asm.push(b"ST,NT,+    1.0kg\r\nST,NT,+    2.0kg\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], b"ST,NT,+    2.0kg\r\n".to_vec());
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn runaway_line_is_discarded() {
        let mut asm = FrameAssembler::new();
        assert!(asm.push(&[b'x'; MAX_LINE + 10]).is_empty());
        assert!(asm.pending() < MAX_LINE);
        let lines = asm.push(b"\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].len() <= MAX_LINE);
    }
}
