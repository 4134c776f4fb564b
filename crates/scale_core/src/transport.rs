//! Abstração do link de saída.
//!
//! Cada frame é entregue inteiro ou falha: escrita parcial conta como erro
//! de transporte e nunca é repetida. Qualquer falha encerra a sessão.

use crate::frame::Frame;
use std::io::Write;

/// Erros do transporte.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Erro escrevendo no link: {0}")]
    Write(#[source] std::io::Error),

    #[error("Escrita parcial: {written} de {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    #[error("Erro ao descarregar o link: {0}")]
    Flush(#[source] std::io::Error),
}

/// Destino de frames (porta serial real ou fake de teste).
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError>;
}

impl<T: FrameSink + ?Sized> FrameSink for &mut T {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        (**self).write_frame(frame)
    }
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        (**self).write_frame(frame)
    }
}

/// Adapta qualquer [`Write`] byte a byte, sem tradução de caracteres.
pub struct IoSink<W: Write> {
    inner: W,
}

impl<W: Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Devolve o handle subjacente (ex: para fechá-lo explicitamente).
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> FrameSink for IoSink<W> {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let expected = frame.len();
        let written = self.inner.write(frame.as_bytes()).map_err(TransportError::Write)?;
        if written != expected {
            return Err(TransportError::PartialWrite { written, expected });
        }
        self.inner.flush().map_err(TransportError::Flush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameConfig;
    use crate::frame::format_frame;
    use std::io;

    /// Aceita no máximo `limit` bytes por chamada.
    struct Trickle {
        limit: usize,
        data: Vec<u8>,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "cabo desconectado"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_exact_bytes() {
        let frame = format_frame(12.3, &FrameConfig::default());
        let mut sink = IoSink::new(Vec::new());
        sink.write_frame(&frame).unwrap();
        assert_eq!(sink.get_ref().as_slice(), b"ST,NT,+   12.3kg\r\n");
    }

    #[test]
    fn partial_write_is_an_error() {
        let frame = format_frame(12.3, &FrameConfig::default());
        let mut sink = IoSink::new(Trickle {
            limit: 5,
            data: Vec::new(),
        });
        let err = sink.write_frame(&frame).unwrap_err();
        assert!(matches!(
            err,
            TransportError::PartialWrite {
                written: 5,
                expected: 18
            }
        ));
        // Sem retry: só a primeira fatia chegou
        assert_eq!(sink.into_inner().data.len(), 5);
    }

    #[test]
    fn io_error_is_propagated() {
        let frame = format_frame(1.0, &FrameConfig::default());
        let mut sink = IoSink::new(Broken);
        assert!(matches!(sink.write_frame(&frame), Err(TransportError::Write(_))));
    }
}
