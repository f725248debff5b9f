use clap::{App, Arg, ArgMatches, SubCommand};
use log::info;
use pvwire::{
    allocators::AllocatorRegistry, create_array, ArrayField, ByteBuffer, ByteOrder, PoolBuilder,
    PvError, Result, ScalarArray, ScalarType, StreamReader, StreamWriter,
};
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("pvwire-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Array value pools and wire codec tool")
        .subcommand(
            SubCommand::with_name("pools")
                .about("Build sample pools and print the allocator report")
                .arg(
                    Arg::with_name("elements")
                        .short("e")
                        .long("elements")
                        .value_name("COUNT")
                        .help("Elements per pool block")
                        .default_value("16")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("roundtrip")
                .about("Serialize a synthetic array and read it back in fragments")
                .arg(
                    Arg::with_name("kind")
                        .short("k")
                        .long("kind")
                        .value_name("TYPE")
                        .help("Element type (boolean, byte, ..., double, string)")
                        .default_value("double")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("count")
                        .short("c")
                        .long("count")
                        .value_name("COUNT")
                        .help("Number of elements")
                        .default_value("1000")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("fragment")
                        .short("f")
                        .long("fragment")
                        .value_name("BYTES")
                        .help("Largest read delivered by the stream")
                        .default_value("7")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("buffer")
                        .short("b")
                        .long("buffer")
                        .value_name("BYTES")
                        .help("Byte buffer capacity")
                        .default_value("64")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("direct")
                        .long("direct")
                        .help("Allow the direct bulk path"),
                )
                .arg(
                    Arg::with_name("little_endian")
                        .long("little-endian")
                        .help("Use little-endian byte order"),
                ),
        )
        .subcommand(SubCommand::with_name("info").about("Show version and build information"))
        .get_matches();

    match matches.subcommand() {
        ("pools", Some(pool_matches)) => handle_pools(pool_matches),
        ("roundtrip", Some(trip_matches)) => handle_roundtrip(trip_matches),
        ("info", Some(_)) => show_info(),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn parse_arg(matches: &ArgMatches, name: &str) -> Result<usize> {
    matches
        .value_of(name)
        .ok_or_else(|| PvError::invalid_parameter(name, "missing value"))?
        .parse()
        .map_err(|_| PvError::invalid_parameter(name, "invalid number"))
}

fn handle_pools(matches: &ArgMatches) -> Result<()> {
    let elements = parse_arg(matches, "elements")?;

    let capped = PoolBuilder::new()
        .name("capped pool")
        .fixed(elements)
        .capped(2)
        .initial(1)
        .build::<f64>()?;
    let cached = PoolBuilder::new()
        .name("cached pool")
        .fixed(elements)
        .cached(2)
        .initial(0)
        .build::<i32>()?;
    let unnamed = PoolBuilder::new().fixed(elements).build::<u8>()?;

    let _held = capped.allocate(elements)?;
    let burst: Vec<_> = (0..3)
        .map(|_| cached.allocate(elements))
        .collect::<Result<_>>()?;
    drop(burst);
    let _small = unnamed.allocate(1)?;

    print!("{}", AllocatorRegistry::global().report());

    for (name, stats) in [
        (capped.name(), capped.raw().stats()),
        (cached.name(), cached.raw().stats()),
    ] {
        println!("{}: {}", name, stats.summary());
    }
    Ok(())
}

fn synthetic(kind: ScalarType, count: usize) -> Result<ScalarArray> {
    let mut array = create_array(ArrayField::new("synthetic", kind));
    match &mut array {
        ScalarArray::Boolean(v) => v.put_from(&(0..count).map(|i| i % 3 == 0).collect::<Vec<_>>())?,
        ScalarArray::Byte(v) => v.put_from(&(0..count).map(|i| i as i8).collect::<Vec<_>>())?,
        ScalarArray::Short(v) => v.put_from(&(0..count).map(|i| i as i16).collect::<Vec<_>>())?,
        ScalarArray::Int(v) => v.put_from(&(0..count).map(|i| i as i32 * 7).collect::<Vec<_>>())?,
        ScalarArray::Long(v) => v.put_from(&(0..count).map(|i| -(i as i64)).collect::<Vec<_>>())?,
        ScalarArray::UByte(v) => v.put_from(&(0..count).map(|i| i as u8).collect::<Vec<_>>())?,
        ScalarArray::UShort(v) => v.put_from(&(0..count).map(|i| i as u16).collect::<Vec<_>>())?,
        ScalarArray::UInt(v) => v.put_from(&(0..count).map(|i| i as u32).collect::<Vec<_>>())?,
        ScalarArray::ULong(v) => v.put_from(&(0..count).map(|i| i as u64).collect::<Vec<_>>())?,
        ScalarArray::Float(v) => v.put_from(&(0..count).map(|i| i as f32 * 0.5).collect::<Vec<_>>())?,
        ScalarArray::Double(v) => v.put_from(&(0..count).map(|i| i as f64 / 3.0).collect::<Vec<_>>())?,
        ScalarArray::String(v) => {
            v.put_from(&(0..count).map(|i| format!("element {}", i)).collect::<Vec<_>>())?
        }
    }
    Ok(array)
}

fn handle_roundtrip(matches: &ArgMatches) -> Result<()> {
    let kind_name = matches.value_of("kind").unwrap_or("double");
    let kind = ScalarType::from_name(kind_name)
        .ok_or_else(|| PvError::invalid_parameter("kind", format!("unknown type '{}'", kind_name)))?;
    let count = parse_arg(matches, "count")?;
    let fragment = parse_arg(matches, "fragment")?;
    let capacity = parse_arg(matches, "buffer")?;
    let direct = matches.is_present("direct");
    let order = if matches.is_present("little_endian") {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    };

    let source = synthetic(kind, count)?;
    info!("round trip of {} {} elements", count, kind);

    let start = Instant::now();
    let mut buffer = ByteBuffer::with_order(capacity, order);
    let mut writer = StreamWriter::new(Vec::new()).with_direct(direct);
    source.serialize(&mut buffer, &mut writer)?;
    writer.finish(&mut buffer)?;
    let encode_time = start.elapsed();
    let flushes = writer.flushes();
    let bytes = writer.into_inner();

    let start = Instant::now();
    let mut buffer = ByteBuffer::with_order(capacity, order);
    buffer.flip();
    let mut reader = StreamReader::new(bytes.as_slice())
        .with_fragment(fragment)
        .with_direct(direct);
    let mut target = create_array(ArrayField::new("synthetic", kind));
    target.deserialize(&mut buffer, &mut reader)?;
    let decode_time = start.elapsed();

    println!("Round trip of {}[{}]:", kind, count);
    println!("  Byte order: {:?}", order);
    println!("  Direct path: {}", direct);
    println!("  Encoded bytes: {}", bytes.len());
    println!("  Buffer flushes: {}", flushes);
    println!("  Stream refills: {}", reader.refills());
    println!("  Encode time: {}μs", encode_time.as_micros());
    println!("  Decode time: {}μs", decode_time.as_micros());
    println!("  Equal: {}", source == target);

    if source != target {
        return Err(PvError::serialization("decoded array differs from source"));
    }
    Ok(())
}

fn show_info() -> Result<()> {
    println!("pvwire v{}", pvwire::VERSION);
    println!("Copy-on-write array values and wire codec");
    println!();
    println!("Build information:");
    println!("  Target: {}", std::env::consts::ARCH);
    println!("  OS: {}", std::env::consts::OS);
    println!("  Native byte order: {:?}", ByteOrder::native());
    println!("  Debug build: {}", cfg!(debug_assertions));
    Ok(())
}
