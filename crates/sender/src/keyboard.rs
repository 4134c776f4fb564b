//! Teclado do operador em modo raw.
//!
//! [`RawModeGuard`] desliga eco e buffer de linha do stdin e restaura a
//! configuração original ao sair de escopo (inclusive em caminhos de erro).
//! [`StdinKeys`] lê no máximo um byte por chamada, sem bloquear.

use scale_core::session::ControlInput;

#[cfg(unix)]
mod imp {
    use std::io;
    use tracing::{debug, warn};

    const STDIN: libc::c_int = libc::STDIN_FILENO;

    /// Guarda do modo raw; restaurar é idempotente.
    pub struct RawModeGuard {
        original: Option<libc::termios>,
    }

    impl RawModeGuard {
        /// Ativa o modo raw. Se o stdin não for um terminal, não faz nada.
        pub fn enable() -> io::Result<Self> {
            // SAFETY: isatty/tcgetattr/tcsetattr só leem/escrevem structs locais
            unsafe {
                if libc::isatty(STDIN) != 1 {
                    debug!("stdin não é um terminal, modo raw ignorado");
                    return Ok(Self { original: None });
                }

                let mut original: libc::termios = std::mem::zeroed();
                if libc::tcgetattr(STDIN, &mut original) != 0 {
                    return Err(io::Error::last_os_error());
                }

                let mut raw = original;
                raw.c_lflag &= !(libc::ICANON | libc::ECHO);
                if libc::tcsetattr(STDIN, libc::TCSANOW, &raw) != 0 {
                    return Err(io::Error::last_os_error());
                }

                debug!("Modo raw ativado no stdin");
                Ok(Self {
                    original: Some(original),
                })
            }
        }

        pub fn is_active(&self) -> bool {
            self.original.is_some()
        }

        /// Restaura o terminal. Chamadas seguintes não fazem nada.
        pub fn restore(&mut self) -> io::Result<()> {
            let Some(original) = self.original.take() else {
                return Ok(());
            };
            // SAFETY: `original` veio de tcgetattr no mesmo descritor
            if unsafe { libc::tcsetattr(STDIN, libc::TCSANOW, &original) } != 0 {
                return Err(io::Error::last_os_error());
            }
            debug!("Terminal restaurado");
            Ok(())
        }
    }

    impl Drop for RawModeGuard {
        fn drop(&mut self) {
            if let Err(e) = self.restore() {
                warn!("Falha ao restaurar o terminal: {e}");
            }
        }
    }

    pub(super) type Fd = libc::c_int;
    pub(super) const STDIN_FD: Fd = STDIN;

    pub(super) fn poll_byte(fd: Fd) -> Option<u8> {
        let mut fds = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: um único pollfd válido, timeout zero
        let ready = unsafe { libc::poll(&mut fds, 1, 0) };
        if ready <= 0 || fds.revents & libc::POLLIN == 0 {
            return None;
        }

        let mut byte = 0u8;
        // SAFETY: lê exatamente 1 byte para dentro de `byte`
        let n = unsafe { libc::read(fd, (&mut byte as *mut u8).cast(), 1) };
        (n == 1).then_some(byte)
    }
}

#[cfg(not(unix))]
mod imp {
    use std::io;
    use tracing::warn;

    /// Sem termios: o console fica como está.
    pub struct RawModeGuard;

    impl RawModeGuard {
        pub fn enable() -> io::Result<Self> {
            warn!("Modo raw não suportado nesta plataforma; teclas de controle desativadas");
            Ok(Self)
        }

        pub fn is_active(&self) -> bool {
            false
        }

        pub fn restore(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(super) type Fd = i32;
    pub(super) const STDIN_FD: Fd = 0;

    pub(super) fn poll_byte(_fd: Fd) -> Option<u8> {
        None
    }
}

pub use imp::RawModeGuard;

/// Teclas lidas do stdin, uma por ciclo; o restante fica no buffer do
/// terminal para os próximos ciclos.
///
/// Só teclas ASCII chegam intactas: cada byte vira um caractere.
#[derive(Debug)]
pub struct StdinKeys {
    fd: imp::Fd,
}

impl StdinKeys {
    pub fn stdin() -> Self {
        Self { fd: imp::STDIN_FD }
    }

    /// Lê de outro descritor (ex: um pipe). O descritor não é fechado.
    #[cfg(all(unix, test))]
    pub fn from_fd(fd: std::os::fd::RawFd) -> Self {
        Self { fd }
    }
}

impl Default for StdinKeys {
    fn default() -> Self {
        Self::stdin()
    }
}

impl ControlInput for StdinKeys {
    fn poll(&mut self) -> Option<char> {
        imp::poll_byte(self.fd).map(char::from)
    }
}
