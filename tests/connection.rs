use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};

use listing_gateway::codec::DEFAULT_MAX_FRAME_SIZE;
use listing_gateway::connection::Connection;

async fn create_tcp_connection() -> Result<(UnboundedSender<Vec<u8>>, TcpStream), std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let local_addr = listener.local_addr()?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            while let Some(data) = rx.recv().await {
                // Write the received channel data to the socket.
                if socket.write_all(&data).await.is_err() {
                    break;
                }
            }
        }
    });

    // Connect to the server as a client to complete the setup.
    let stream = TcpStream::connect(local_addr).await?;

    Ok((tx, stream))
}

fn connection(stream: TcpStream) -> Connection {
    Connection::new(stream, "test", DEFAULT_MAX_FRAME_SIZE)
}

#[tokio::test]
async fn test_read_single_line() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut connection = connection(tcp_stream);

    tcp_stream_tx.send(b"LIST\n".to_vec()).unwrap();

    let actual = connection.read_line().await.unwrap();
    assert_eq!(actual, Some(String::from("LIST")));
}

#[tokio::test]
async fn test_read_crlf_line() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut connection = connection(tcp_stream);

    tcp_stream_tx
        .send(b"SEARCH Lakewood 450000\r\n".to_vec())
        .unwrap();

    let actual = connection.read_line().await.unwrap();
    assert_eq!(actual, Some(String::from("SEARCH Lakewood 450000")));
}

#[tokio::test]
async fn test_read_multiple_lines_sequentially() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut connection = connection(tcp_stream);

    tcp_stream_tx
        .send(b"LIST\n\nSEARCH Lakewood 450000\n".to_vec())
        .unwrap();
    tcp_stream_tx.send(b"QUIT\n".to_vec()).unwrap();

    let expected = ["LIST", "", "SEARCH Lakewood 450000", "QUIT"];
    for line in expected {
        let actual = connection.read_line().await.unwrap();
        assert_eq!(actual, Some(String::from(line)));
    }
}

#[tokio::test]
async fn test_read_incomplete_line() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut connection = connection(tcp_stream);

    // Command split into three parts to simulate partial/incomplete data sending.
    let part1 = b"SEA";
    let part2 = b"RCH Lake";
    let part3 = b"wood 450000\n";

    tokio::spawn(async move {
        let parts = vec![part1.to_vec(), part2.to_vec(), part3.to_vec()];
        for part in parts {
            tcp_stream_tx.send(part).unwrap();
            // Simulate a delay in sending/receiving the data.
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    });

    let actual = connection.read_line().await.unwrap();
    assert_eq!(actual, Some(String::from("SEARCH Lakewood 450000")));
}

#[tokio::test]
async fn test_peer_disconnect() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut connection = connection(tcp_stream);

    tcp_stream_tx.send(b"LIST\nLIS".to_vec()).unwrap();
    // Closing the channel makes the peer drop its socket.
    drop(tcp_stream_tx);

    let actual = connection.read_line().await.unwrap();
    assert_eq!(actual, Some(String::from("LIST")));

    // The unterminated tail is discarded.
    let actual = connection.read_line().await.unwrap();
    assert_eq!(actual, None);
}
