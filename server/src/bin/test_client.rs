use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

// Minimal interactive client for poking at the server: forwards stdin lines
// to the socket and prints everything the server pushes back.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let stream = TcpStream::connect(&args.server).await?;
    println!("connected to {}", args.server);
    println!("commands: NEW, LIST [SPECTATE], JOIN <id>, SPECTATE <id>, LEAVE,");
    println!("          MOVE <sx> <sy> <dx> <dy>, BOARD, TURN, QUIT");

    let (read_half, mut write_half) = stream.into_split();

    let printer = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("{}", line);
        }
        println!("server closed the connection");
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = stdin.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        write_half.write_all(line.as_bytes()).await?;
        write_half.write_all(b"\r\n").await?;
        if line.split_whitespace().next() == Some("QUIT") {
            break;
        }
    }

    drop(write_half);
    let _ = printer.await;
    Ok(())
}
