use bytes::Bytes;
use rtmp_amf0::Amf0Value;
use rtmp_engine::connection::{ClientConn, Conn, RtmpError, RtmpUrl, ServerConn};
use rtmp_engine::handshake::HandshakeError;
use rtmp_engine::media::{AccessUnit, Codec, MediaKind, Track, TrackError};
use rtmp_engine::messages::{
    MessagePayload, RtmpMessage, AUDIO_CHUNK_STREAM_ID, AUDIO_TYPE_ID,
};
use rtmp_engine::sessions::{ClientSessionConfig, ServerSessionConfig, StreamMode};
use rtmp_engine::time::RtmpTimestamp;
use rtmp_engine::{Reader, ReaderConfig, ReaderEvent, Writer};
use std::collections::HashMap;
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const AVC_CONFIG: &[u8] = &[0x01, 0x64, 0x00, 0x1F, 0xFF];

fn listen() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    (listener, address)
}

fn connect(address: SocketAddr, mode: StreamMode) -> ClientConn<TcpStream> {
    connect_to(address, "live/key", mode)
}

fn connect_to(address: SocketAddr, path: &str, mode: StreamMode) -> ClientConn<TcpStream> {
    let url = RtmpUrl::parse(&format!("rtmp://{}/{}", address, path)).unwrap();
    let stream = TcpStream::connect(url.address()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    ClientConn::connect(stream, &url, mode, ClientSessionConfig::new()).unwrap()
}

fn accept(listener: &TcpListener) -> Result<ServerConn<TcpStream>, RtmpError> {
    let (stream, _) = listener.accept().unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    ServerConn::accept(stream, ServerSessionConfig::new())
}

fn video_unit() -> AccessUnit {
    AccessUnit {
        pts: RtmpTimestamp::new(100),
        dts: RtmpTimestamp::new(90),
        keyframe: true,
        units: vec![
            Bytes::from_static(&[0x65, 0x88, 0x84]),
            Bytes::from_static(&[0x06, 0x05]),
        ],
    }
}

fn next_access_unit<C: Conn>(reader: &mut Reader<C>) -> (MediaKind, AccessUnit) {
    for _ in 0..16 {
        if let ReaderEvent::AccessUnit { kind, unit } = reader.read().unwrap() {
            return (kind, unit);
        }
    }

    panic!("No access unit received");
}

#[test]
fn published_video_is_read_by_the_server() {
    let (listener, address) = listen();
    let (done_sender, done_receiver) = mpsc::channel();

    let publisher = thread::spawn(move || {
        let connection = connect(address, StreamMode::Publish);
        assert_eq!(connection.stream_id(), 1);

        let track = Track::with_config(Codec::H264, 0, Bytes::from_static(AVC_CONFIG));
        let mut writer = Writer::initialize(connection, vec![track.clone()]).unwrap();
        writer.write(&track, &video_unit()).unwrap();

        done_receiver.recv().unwrap();
    });

    let connection = accept(&listener).unwrap();
    assert!(connection.is_publishing());
    assert_eq!(connection.app_name(), "live");
    assert_eq!(connection.stream_key(), "key");

    let mut reader = Reader::initialize(connection, ReaderConfig::new()).unwrap();
    assert_eq!(reader.tracks().len(), 1);

    let track = reader.track(MediaKind::Video).unwrap();
    assert_eq!(track.codec(), Codec::H264);
    assert_eq!(&track.config().unwrap()[..], AVC_CONFIG);
    assert_eq!(
        reader.metadata().unwrap().get("videocodecid"),
        Some(&Amf0Value::Number(7.0))
    );

    let (kind, unit) = next_access_unit(&mut reader);
    assert_eq!(kind, MediaKind::Video);
    assert_eq!(unit, video_unit());

    done_sender.send(()).unwrap();
    publisher.join().unwrap();
}

#[test]
fn single_segment_url_publishes_with_an_empty_stream_key() {
    let (listener, address) = listen();
    let (done_sender, done_receiver) = mpsc::channel();

    let publisher = thread::spawn(move || {
        let connection = connect_to(address, "stream", StreamMode::Publish);
        done_receiver.recv().unwrap();
        connection.stream_id()
    });

    let connection = accept(&listener).unwrap();
    assert!(connection.is_publishing());
    assert_eq!(connection.app_name(), "stream");
    assert_eq!(connection.stream_key(), "");

    done_sender.send(()).unwrap();
    assert_eq!(publisher.join().unwrap(), 1);
}

#[test]
fn played_video_is_read_by_the_client() {
    let (listener, address) = listen();
    let (done_sender, done_receiver) = mpsc::channel();

    let player = thread::spawn(move || {
        let connection = connect(address, StreamMode::Play);
        let mut reader = Reader::initialize(connection, ReaderConfig::new()).unwrap();
        assert_eq!(reader.track(MediaKind::Video).unwrap().codec(), Codec::H264);

        let (kind, unit) = next_access_unit(&mut reader);
        done_sender.send(()).unwrap();
        (kind, unit)
    });

    let connection = accept(&listener).unwrap();
    assert!(!connection.is_publishing());

    let track = Track::with_config(Codec::H264, 0, Bytes::from_static(AVC_CONFIG));
    let mut writer = Writer::initialize(connection, vec![track.clone()]).unwrap();
    writer.write(&track, &video_unit()).unwrap();

    done_receiver.recv().unwrap();
    let (kind, unit) = player.join().unwrap();
    assert_eq!(kind, MediaKind::Video);
    assert_eq!(unit, video_unit());
}

#[test]
fn unsupported_audio_does_not_stop_video() {
    let (listener, address) = listen();
    let (done_sender, done_receiver) = mpsc::channel();

    let publisher = thread::spawn(move || {
        let mut connection = connect(address, StreamMode::Publish);
        let stream_id = connection.stream_id();

        let mut properties = HashMap::new();
        properties.insert("videocodecid".to_string(), Amf0Value::Number(7.0));
        properties.insert("audiocodecid".to_string(), Amf0Value::Number(6.0));
        let metadata = RtmpMessage::Amf0Data {
            values: vec![
                Amf0Value::Utf8String("onMetaData".to_string()),
                Amf0Value::EcmaArray(properties),
            ],
        }
        .into_message_payload(RtmpTimestamp::new(0), stream_id)
        .unwrap();

        // Nellymoser has no framing support
        let audio = MessagePayload {
            chunk_stream_id: AUDIO_CHUNK_STREAM_ID,
            timestamp: RtmpTimestamp::new(0),
            type_id: AUDIO_TYPE_ID,
            message_stream_id: stream_id,
            data: Bytes::from_static(&[0x62, 0x01, 0x02]),
        };

        let track = Track::with_config(Codec::H264, stream_id, Bytes::from_static(AVC_CONFIG));
        let video = track.encode(&video_unit()).unwrap();

        connection.write(&metadata).unwrap();
        connection.write(&audio).unwrap();
        connection.write(&track.encode_config(RtmpTimestamp::new(0)).unwrap()).unwrap();
        connection.write(&video).unwrap();
        connection.write(&audio).unwrap();
        connection.write(&video).unwrap();

        done_receiver.recv().unwrap();
    });

    let connection = accept(&listener).unwrap();
    let mut reader = Reader::initialize(connection, ReaderConfig::new()).unwrap();
    assert_eq!(reader.tracks().len(), 1);
    assert!(reader.track(MediaKind::Audio).is_none());

    let (kind, _) = next_access_unit(&mut reader);
    assert_eq!(kind, MediaKind::Video);

    match reader.read() {
        Err(error @ RtmpError::Track { .. }) => {
            assert!(!error.is_fatal());
            match error {
                RtmpError::Track {
                    kind: MediaKind::Audio,
                    source: TrackError::UnsupportedCodec { .. },
                } => (),
                x => panic!("Unexpected track error: {:?}", x),
            }
        }
        x => panic!("Expected an audio track error, got {:?}", x),
    }

    let (kind, unit) = next_access_unit(&mut reader);
    assert_eq!(kind, MediaKind::Video);
    assert_eq!(unit, video_unit());

    done_sender.send(()).unwrap();
    publisher.join().unwrap();
}

#[test]
fn bad_handshake_version_fails_accept() {
    let (listener, address) = listen();

    let client = thread::spawn(move || {
        let mut stream = TcpStream::connect(address).unwrap();
        let mut packet = vec![6_u8];
        packet.extend_from_slice(&[0; 1536]);
        let _ = stream.write_all(&packet);
    });

    match accept(&listener) {
        Err(RtmpError::Handshake(HandshakeError::BadVersionId { version: 6 })) => (),
        Err(x) => panic!("Expected bad version error, got {:?}", x),
        Ok(_) => panic!("Expected bad version error, got a connection"),
    }

    client.join().unwrap();
}
