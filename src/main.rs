mod console;
mod entry;
mod shutdown_handlers;

use lapreplay::error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
