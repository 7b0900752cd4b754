use std::io::{self, Write};

use slog::{o, Drain, Logger, OwnedKVList, Record, KV};
use slog_term::{
    timestamp_local, CountingWriter, Decorator, RecordDecorator, Serializer,
    ThreadSafeTimestampFn,
};

pub use slog_async::Async;
pub use slog_term::TermDecorator;

/// Single line terminal format which prefixes each message with the
/// name of the component that logged it, e.g.
///
/// `Oct 16 12:00:00.000 INFO depositor: Deposit submitted, mode: create, ...`
pub struct PrefixedFormat<D>
where
    D: Decorator,
{
    decorator: D,
    fn_timestamp: Box<dyn ThreadSafeTimestampFn<Output = io::Result<()>>>,
    prefix: String,
}

impl<D> PrefixedFormat<D>
where
    D: Decorator,
{
    pub fn new(prefix: &str, decorator: D) -> Self {
        Self {
            decorator,
            fn_timestamp: Box::new(timestamp_local),
            prefix: prefix.to_owned(),
        }
    }
}

impl<D> Drain for PrefixedFormat<D>
where
    D: Decorator,
{
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record<'_>, values: &OwnedKVList) -> Result<Self::Ok, Self::Err> {
        self.decorator.with_record(record, values, |decorator| {
            let comma_needed = write_header(&self.prefix, &*self.fn_timestamp, decorator, record)?;

            let mut serializer = Serializer::new(decorator, comma_needed, true);
            // the record key-values first, then the ones of the logger
            record.kv().serialize(record, &mut serializer)?;
            values.serialize(record, &mut serializer)?;
            serializer.finish()?;

            decorator.start_whitespace()?;
            writeln!(decorator)?;
            decorator.flush()?;

            Ok(())
        })
    }
}

fn write_header(
    prefix: &str,
    fn_timestamp: &dyn ThreadSafeTimestampFn<Output = io::Result<()>>,
    mut rd: &mut dyn RecordDecorator,
    record: &Record<'_>,
) -> io::Result<bool> {
    rd.start_timestamp()?;
    fn_timestamp(&mut rd)?;

    rd.start_whitespace()?;
    write!(rd, " ")?;

    rd.start_level()?;
    write!(rd, "{}", record.level().as_short_str())?;

    rd.start_whitespace()?;
    write!(rd, " ")?;

    rd.start_msg()?;
    write!(rd, "{}: ", prefix)?;

    let mut count_rd = CountingWriter::new(&mut rd);
    write!(count_rd, "{}", record.msg())?;

    Ok(count_rd.count() != 0)
}

/// Asynchronous terminal [`Logger`] writing to `stderr` with the given prefix.
pub fn new_logger(prefix: &str) -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = PrefixedFormat::new(prefix, decorator).fuse();
    let drain = Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}
