//! Saída de status no console (stdout), opcionalmente colorida.

use scale_core::messages::{StatusMessage, StatusReporter};

pub struct ConsoleReporter {
    color: bool,
}

impl ConsoleReporter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl StatusReporter for ConsoleReporter {
    fn report(&mut self, message: StatusMessage) {
        println!("{}", message.render(self.color));
    }
}
